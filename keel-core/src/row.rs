use crate::{ChainError, FromValue, Result, Value};
use std::sync::Arc;

/// Shared reference-counted column name list. All rows of a result set point
/// at the same allocation.
pub type RowNames = Arc<[String]>;

/// One result row: column labels plus values aligned by index.
/// Immutable once read.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    labels: RowNames,
    values: Box<[Value]>,
}

impl Row {
    pub fn new(labels: RowNames, values: Box<[Value]>) -> Self {
        debug_assert_eq!(labels.len(), values.len());
        Self { labels, values }
    }

    pub fn names(&self) -> &[String] {
        &self.labels
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.labels
            .iter()
            .position(|v| v.eq_ignore_ascii_case(name))
            .map(|i| &self.values[i])
    }

    pub fn try_get(&self, name: &str) -> Result<&Value> {
        self.get(name).ok_or_else(|| {
            ChainError::mapping(format!("result set has no column named \"{}\"", name))
        })
    }

    /// Read a column as a host value. Missing column or type mismatch is a
    /// mapping error; read through `Option<T>` when the column may be absent
    /// from a narrowed projection.
    pub fn get_as<V: FromValue>(&self, name: &str) -> Result<V> {
        V::from_value(self.try_get(name)?)
    }

    /// Like [`Row::get_as`] but a column missing from the projection reads as
    /// `None` instead of failing. Used by types that support partial
    /// materialization.
    pub fn get_opt<V: FromValue>(&self, name: &str) -> Result<Option<V>> {
        match self.get(name) {
            Some(value) => Option::<V>::from_value(value),
            None => Ok(None),
        }
    }
}

/// All rows of one result set sharing a single label list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    labels: RowNames,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(labels: RowNames, value_rows: Vec<Box<[Value]>>) -> Self {
        let rows = value_rows
            .into_iter()
            .map(|values| Row::new(labels.clone(), values))
            .collect();
        Self { labels, rows }
    }

    /// Assemble from already-labeled rows, e.g. a drained stream.
    pub fn from_rows(labels: RowNames, rows: Vec<Row>) -> Self {
        Self { labels, rows }
    }

    pub fn empty(labels: RowNames) -> Self {
        Self {
            labels,
            rows: Vec::new(),
        }
    }

    pub fn names(&self) -> &[String] {
        &self.labels
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Default for Row {
    fn default() -> Self {
        Self {
            labels: Arc::from(Vec::<String>::new()),
            values: Box::from([]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Row {
        let labels: RowNames = Arc::from(["Id".to_string(), "Name".to_string()]);
        Row::new(
            labels,
            Box::from([Value::Int32(Some(5)), Value::Varchar(Some("A".into()))]),
        )
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let row = sample();
        assert_eq!(row.get_as::<i32>("id").unwrap(), 5);
        assert_eq!(row.get_as::<String>("NAME").unwrap(), "A");
    }

    #[test]
    fn missing_column_is_a_mapping_error_unless_optional() {
        let row = sample();
        assert!(matches!(
            row.get_as::<i32>("Age"),
            Err(ChainError::Mapping { .. })
        ));
        assert_eq!(row.get_opt::<i32>("Age").unwrap(), None);
    }
}
