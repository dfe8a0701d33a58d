use crate::{
    AsyncExecutor, ChainError, DesiredColumns, Executor, ExecutionToken, FromValue, Result, Row,
    RowOptions, Table, Value,
};
use std::marker::PhantomData;
use tokio_util::sync::CancellationToken;

/// A type that can be built from one result row.
///
/// `COLUMNS` is the type's precomputed column mapping: the projection a typed
/// materializer requests, and the set `from_row` may read. A required column
/// missing from the row is a mapping error (no guessing between alternative
/// shapes); fields meant to survive a narrowed projection should read through
/// [`Row::get_opt`] and fall back to their default.
pub trait FromRow: Sized {
    const COLUMNS: &'static [&'static str];

    fn from_row(row: &Row) -> Result<Self>;
}

/// Command builders that render into an executable, row-producing token.
pub trait Prepares {
    fn prepare(&self, desired: DesiredColumns<'_>) -> Result<ExecutionToken>;
}

/// Terminal materializer selectors, available on every row-producing command
/// builder.
pub trait Materialize: Prepares + Sized {
    /// Materialize at most one row into `T`.
    fn to_object<T: FromRow>(self, options: RowOptions) -> ObjectShape<Self, T> {
        ObjectShape {
            source: self,
            options,
            include: None,
            exclude: Vec::new(),
            _target: PhantomData,
        }
    }

    /// Materialize every row into a `Vec<T>`.
    fn to_collection<T: FromRow>(self) -> CollectionShape<Self, T> {
        CollectionShape {
            source: self,
            include: None,
            exclude: Vec::new(),
            _target: PhantomData,
        }
    }

    /// Materialize at most one row as a loose name/value row.
    fn to_row(self, options: RowOptions) -> RowShape<Self> {
        RowShape {
            source: self,
            options,
        }
    }

    /// Materialize the whole result set.
    fn to_table(self) -> TableShape<Self> {
        TableShape { source: self }
    }

    /// Materialize the first column of the single row as a scalar.
    fn to_value<V: FromValue>(self) -> ScalarShape<Self, V> {
        ScalarShape {
            source: self,
            column: None,
            _value: PhantomData,
        }
    }

    /// Materialize the named column of the single row as a scalar.
    fn to_value_of<V: FromValue>(self, column: &'static str) -> ScalarShape<Self, V> {
        ScalarShape {
            source: self,
            column: Some(column),
            _value: PhantomData,
        }
    }
}

impl<P: Prepares> Materialize for P {}

/// Single-row policy shared by every one-row materializer: zero rows is
/// `None` unless empty results are forbidden, extra rows are an error unless
/// explicitly discarded.
fn single_row(
    table: Table,
    options: RowOptions,
    operation: &'static str,
    target: &str,
) -> Result<Option<Row>> {
    let rows = table.len();
    if rows == 0 {
        return if options.prevent_empty_results {
            Err(ChainError::MissingData {
                operation,
                target: target.to_string(),
            })
        } else {
            Ok(None)
        };
    }
    if rows > 1 && !options.discard_extra_rows {
        return Err(ChainError::UnexpectedData {
            operation,
            target: target.to_string(),
            rows,
        });
    }
    Ok(table.into_rows().into_iter().next())
}

fn narrowed_columns<T: FromRow>(
    include: Option<&Vec<&'static str>>,
    exclude: &[&'static str],
) -> Result<Vec<&'static str>> {
    let base: Vec<&'static str> = match include {
        Some(named) => {
            for name in named {
                if !T::COLUMNS.iter().any(|c| c.eq_ignore_ascii_case(name)) {
                    return Err(ChainError::mapping(format!(
                        "with_properties names \"{}\" which is not a mapped column of the target type",
                        name
                    )));
                }
            }
            named.clone()
        }
        None => T::COLUMNS.to_vec(),
    };
    Ok(base
        .into_iter()
        .filter(|c| !exclude.iter().any(|e| e.eq_ignore_ascii_case(c)))
        .collect())
}

/// Materializes at most one typed object.
pub struct ObjectShape<P, T> {
    source: P,
    options: RowOptions,
    include: Option<Vec<&'static str>>,
    exclude: Vec<&'static str>,
    _target: PhantomData<T>,
}

impl<P: Prepares, T: FromRow> ObjectShape<P, T> {
    /// Fetch and populate only the named columns; everything else stays at its
    /// default.
    pub fn with_properties(mut self, columns: &[&'static str]) -> Self {
        self.include = Some(columns.to_vec());
        self
    }

    /// Fetch and populate everything except the named columns.
    pub fn except_properties(mut self, columns: &[&'static str]) -> Self {
        self.exclude.extend_from_slice(columns);
        self
    }

    pub fn execute<E: Executor>(&self, executor: &mut E) -> Result<Option<T>> {
        let columns = narrowed_columns::<T>(self.include.as_ref(), &self.exclude)?;
        let token = self.source.prepare(DesiredColumns::List(&columns))?;
        let table = token.query(executor)?;
        single_row(table, self.options, token.operation, &token.target)?
            .map(|row| T::from_row(&row))
            .transpose()
    }

    pub async fn execute_async<E: AsyncExecutor>(
        &self,
        executor: &mut E,
        cancellation: &CancellationToken,
    ) -> Result<Option<T>> {
        let columns = narrowed_columns::<T>(self.include.as_ref(), &self.exclude)?;
        let token = self.source.prepare(DesiredColumns::List(&columns))?;
        let table = token.query_async(executor, cancellation).await?;
        single_row(table, self.options, token.operation, &token.target)?
            .map(|row| T::from_row(&row))
            .transpose()
    }
}

/// Materializes every row into a `Vec<T>` using the same construction logic
/// as the single-object shape, accumulated instead of policed.
pub struct CollectionShape<P, T> {
    source: P,
    include: Option<Vec<&'static str>>,
    exclude: Vec<&'static str>,
    _target: PhantomData<T>,
}

impl<P: Prepares, T: FromRow> CollectionShape<P, T> {
    pub fn with_properties(mut self, columns: &[&'static str]) -> Self {
        self.include = Some(columns.to_vec());
        self
    }

    pub fn except_properties(mut self, columns: &[&'static str]) -> Self {
        self.exclude.extend_from_slice(columns);
        self
    }

    pub fn execute<E: Executor>(&self, executor: &mut E) -> Result<Vec<T>> {
        let columns = narrowed_columns::<T>(self.include.as_ref(), &self.exclude)?;
        let token = self.source.prepare(DesiredColumns::List(&columns))?;
        let table = token.query(executor)?;
        table.rows().iter().map(T::from_row).collect()
    }

    pub async fn execute_async<E: AsyncExecutor>(
        &self,
        executor: &mut E,
        cancellation: &CancellationToken,
    ) -> Result<Vec<T>> {
        let columns = narrowed_columns::<T>(self.include.as_ref(), &self.exclude)?;
        let token = self.source.prepare(DesiredColumns::List(&columns))?;
        let table = token.query_async(executor, cancellation).await?;
        table.rows().iter().map(T::from_row).collect()
    }
}

/// Materializes at most one loose row.
pub struct RowShape<P> {
    source: P,
    options: RowOptions,
}

impl<P: Prepares> RowShape<P> {
    pub fn execute<E: Executor>(&self, executor: &mut E) -> Result<Option<Row>> {
        let token = self.source.prepare(DesiredColumns::All)?;
        let table = token.query(executor)?;
        single_row(table, self.options, token.operation, &token.target)
    }

    pub async fn execute_async<E: AsyncExecutor>(
        &self,
        executor: &mut E,
        cancellation: &CancellationToken,
    ) -> Result<Option<Row>> {
        let token = self.source.prepare(DesiredColumns::All)?;
        let table = token.query_async(executor, cancellation).await?;
        single_row(table, self.options, token.operation, &token.target)
    }
}

/// Materializes the whole result set as-is.
pub struct TableShape<P> {
    source: P,
}

impl<P: Prepares> TableShape<P> {
    pub fn execute<E: Executor>(&self, executor: &mut E) -> Result<Table> {
        let token = self.source.prepare(DesiredColumns::All)?;
        token.query(executor)
    }

    pub async fn execute_async<E: AsyncExecutor>(
        &self,
        executor: &mut E,
        cancellation: &CancellationToken,
    ) -> Result<Table> {
        let token = self.source.prepare(DesiredColumns::All)?;
        token.query_async(executor, cancellation).await
    }
}

/// Materializes one scalar value out of a single-row result.
pub struct ScalarShape<P, V> {
    source: P,
    column: Option<&'static str>,
    _value: PhantomData<V>,
}

impl<P: Prepares, V: FromValue> ScalarShape<P, V> {
    fn fetch_value(&self, table: Table, operation: &'static str, target: &str) -> Result<Value> {
        let Some(row) = single_row(
            table,
            RowOptions::default().prevent_empty_results(),
            operation,
            target,
        )?
        else {
            return Err(ChainError::MissingData {
                operation,
                target: target.to_string(),
            });
        };
        match self.column {
            Some(name) => row.try_get(name).cloned(),
            None => row.values().first().cloned().ok_or_else(|| {
                ChainError::mapping("the result set has no columns to read a scalar from")
            }),
        }
    }

    fn desired(&self) -> DesiredColumns<'_> {
        match &self.column {
            Some(name) => DesiredColumns::List(std::slice::from_ref(name)),
            None => DesiredColumns::All,
        }
    }

    /// The scalar; zero rows or a NULL into a non-`Option` type is an error.
    pub fn execute<E: Executor>(&self, executor: &mut E) -> Result<V> {
        let token = self.source.prepare(self.desired())?;
        let table = token.query(executor)?;
        let value = self.fetch_value(table, token.operation, &token.target)?;
        V::from_value(&value)
    }

    /// The scalar, with zero rows flattened to `None`.
    pub fn execute_or_null<E: Executor>(&self, executor: &mut E) -> Result<Option<V>> {
        let token = self.source.prepare(self.desired())?;
        let table = token.query(executor)?;
        if table.is_empty() {
            return Ok(None);
        }
        let value = self.fetch_value(table, token.operation, &token.target)?;
        Option::<V>::from_value(&value)
    }

    pub async fn execute_async<E: AsyncExecutor>(
        &self,
        executor: &mut E,
        cancellation: &CancellationToken,
    ) -> Result<V> {
        let token = self.source.prepare(self.desired())?;
        let table = token.query_async(executor, cancellation).await?;
        let value = self.fetch_value(table, token.operation, &token.target)?;
        V::from_value(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RowNames, Value};
    use std::sync::Arc;

    fn table_of(names: &[&str], rows: &[&[Value]]) -> Table {
        let labels: RowNames = Arc::from(
            names
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>(),
        );
        Table::new(labels, rows.iter().map(|r| Box::from(*r)).collect())
    }

    #[test]
    fn zero_rows_defaults_to_none() {
        let table = table_of(&["A"], &[]);
        let row = single_row(table, RowOptions::default(), "from", "T").unwrap();
        assert!(row.is_none());
    }

    #[test]
    fn zero_rows_with_prevent_empty_is_missing_data() {
        let table = table_of(&["A"], &[]);
        let error = single_row(
            table,
            RowOptions::default().prevent_empty_results(),
            "from",
            "T",
        )
        .unwrap_err();
        assert!(matches!(error, ChainError::MissingData { .. }));
    }

    #[test]
    fn two_rows_default_is_unexpected_data() {
        let table = table_of(
            &["A"],
            &[&[Value::Int32(Some(1))], &[Value::Int32(Some(2))]],
        );
        let error = single_row(table, RowOptions::default(), "from", "T").unwrap_err();
        assert!(matches!(error, ChainError::UnexpectedData { rows: 2, .. }));
    }

    #[test]
    fn two_rows_with_discard_keeps_the_first() {
        let table = table_of(
            &["A"],
            &[&[Value::Int32(Some(1))], &[Value::Int32(Some(2))]],
        );
        let row = single_row(
            table,
            RowOptions::default().discard_extra_rows(),
            "from",
            "T",
        )
        .unwrap()
        .unwrap();
        assert_eq!(row.get_as::<i32>("A").unwrap(), 1);
    }
}
