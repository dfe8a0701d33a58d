use super::SourceContext;
use crate::{
    Arguments, ChainError, CommandType, DesiredColumns, ExecutionToken, Executor, FilterOptions,
    Prepares, Result, ReturningStyle, SqlBuilder, TableOrViewMetadata, Value,
};
use std::sync::Arc;

enum KeySpec {
    Values(Vec<Value>),
    Object(Arguments),
}

/// A DELETE of one row matched by key. When the data source carries a
/// soft-delete rule and the table has its column, the statement is rewritten
/// to an UPDATE that marks the row instead.
pub struct DeleteCommand<'a> {
    ctx: SourceContext<'a>,
    table: Arc<TableOrViewMetadata>,
    keys: KeySpec,
    expected_row_count: Option<u64>,
}

impl<'a> DeleteCommand<'a> {
    pub(crate) fn by_keys(
        ctx: SourceContext<'a>,
        table: Arc<TableOrViewMetadata>,
        keys: Vec<Value>,
    ) -> Self {
        Self {
            ctx,
            table,
            keys: KeySpec::Values(keys),
            expected_row_count: None,
        }
    }

    pub(crate) fn by_arguments(
        ctx: SourceContext<'a>,
        table: Arc<TableOrViewMetadata>,
        args: Arguments,
    ) -> Self {
        Self {
            ctx,
            table,
            keys: KeySpec::Object(args),
            expected_row_count: None,
        }
    }

    /// Fail unless the statement affects exactly this many rows.
    pub fn with_expected_row_count(mut self, expected: u64) -> Self {
        self.expected_row_count = Some(expected);
        self
    }

    pub fn execute<E: Executor>(&self, executor: &mut E) -> Result<u64> {
        self.prepare(DesiredColumns::None)?.execute(executor)
    }

}

impl Prepares for DeleteCommand<'_> {
    fn prepare(&self, desired: DesiredColumns<'_>) -> Result<ExecutionToken> {
        let dialect = self.ctx.dialect;
        let mut builder = SqlBuilder::new(&self.table, dialect, "delete");
        match &self.keys {
            KeySpec::Values(keys) => builder.apply_key_values(keys)?,
            KeySpec::Object(args) => builder.apply_key_arguments(args)?,
        }
        builder.apply_desired_columns(desired)?;
        let style = dialect.returning_style();
        if builder.selected_count() > 0 && style == ReturningStyle::Unsupported {
            return Err(ChainError::validation(format!(
                "{} cannot return values from a DELETE",
                dialect.name()
            )));
        }

        let soft_delete = self
            .ctx
            .audit
            .soft_delete()
            .and_then(|rule| self.table.column(&rule.column).map(|column| (rule, column)));
        let mut sql = String::new();
        if let Some((rule, column)) = soft_delete {
            sql.push_str("UPDATE ");
            sql.push_str(&self.table.quoted_name);
            sql.push_str("\nSET ");
            sql.push_str(&column.quoted_sql_name);
            sql.push_str(" = ");
            dialect.write_value(&mut sql, &rule.deleted_value);
            if builder.selected_count() > 0 && style == ReturningStyle::Output {
                sql.push_str("\nOUTPUT ");
                builder.render_selected_columns(&mut sql, "Inserted.");
            }
            sql.push_str("\nWHERE ");
            builder.render_key_predicate(&mut sql)?;
        } else {
            sql.push_str("DELETE FROM ");
            sql.push_str(&self.table.quoted_name);
            if builder.selected_count() > 0 && style == ReturningStyle::Output {
                sql.push_str("\nOUTPUT ");
                builder.render_selected_columns(&mut sql, "Deleted.");
            }
            sql.push_str("\nWHERE ");
            builder.render_key_predicate(&mut sql)?;
        }
        if builder.selected_count() > 0 && style == ReturningStyle::Returning {
            sql.push_str("\nRETURNING ");
            builder.render_selected_columns(&mut sql, "");
        }

        Ok(ExecutionToken {
            operation: "delete",
            target: self.table.name.to_string(),
            sql,
            parameters: builder.into_parameters(),
            command_type: CommandType::Text,
            expected_row_count: self.expected_row_count,
            data_source: self.ctx.data_source.to_string(),
            listeners: self.ctx.listeners.clone(),
        })
    }
}

/// A DELETE scoped by a filter or a caller-authored where clause rather than
/// a key. Deleting with no predicate at all is rejected; wiping a table must
/// be written as raw SQL on purpose.
pub struct DeleteManyCommand<'a> {
    ctx: SourceContext<'a>,
    table: Arc<TableOrViewMetadata>,
    filter: Option<(Arguments, FilterOptions)>,
    where_clause: Option<(String, Arguments)>,
    expected_row_count: Option<u64>,
}

impl<'a> DeleteManyCommand<'a> {
    pub(crate) fn new(ctx: SourceContext<'a>, table: Arc<TableOrViewMetadata>) -> Self {
        Self {
            ctx,
            table,
            filter: None,
            where_clause: None,
            expected_row_count: None,
        }
    }

    pub fn with_filter(mut self, filter: Arguments, options: FilterOptions) -> Self {
        self.filter = Some((filter, options));
        self.where_clause = None;
        self
    }

    pub fn with_where(mut self, clause: impl Into<String>, args: Arguments) -> Self {
        self.where_clause = Some((clause.into(), args));
        self.filter = None;
        self
    }

    pub fn with_expected_row_count(mut self, expected: u64) -> Self {
        self.expected_row_count = Some(expected);
        self
    }

    pub fn execute<E: Executor>(&self, executor: &mut E) -> Result<u64> {
        self.prepare(DesiredColumns::None)?.execute(executor)
    }
}

impl Prepares for DeleteManyCommand<'_> {
    fn prepare(&self, _desired: DesiredColumns<'_>) -> Result<ExecutionToken> {
        let mut builder = SqlBuilder::new(&self.table, self.ctx.dialect, "delete_with_filter");
        if self.filter.is_none() && self.where_clause.is_none() {
            return Err(ChainError::validation(format!(
                "delete_with_filter: refusing to delete every row of {}; supply a filter",
                self.table.name
            )));
        }
        if let Some((filter, options)) = &self.filter {
            builder.apply_filter_value(filter, *options)?;
        }
        let mut sql = String::new();
        sql.push_str("DELETE FROM ");
        sql.push_str(&self.table.quoted_name);
        sql.push_str("\nWHERE ");
        if self.filter.is_some() {
            builder.render_filter_predicate(&mut sql);
        } else if let Some((clause, args)) = &self.where_clause {
            sql.push_str(clause);
            builder.append_where_clause_parameters(args)?;
        }
        Ok(ExecutionToken {
            operation: "delete_with_filter",
            target: self.table.name.to_string(),
            sql,
            parameters: builder.into_parameters(),
            command_type: CommandType::Text,
            expected_row_count: self.expected_row_count,
            data_source: self.ctx.data_source.to_string(),
            listeners: self.ctx.listeners.clone(),
        })
    }
}
