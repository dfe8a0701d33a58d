use super::SourceContext;
use crate::{
    Arguments, ChainError, CommandType, DesiredColumns, ExecutionToken, Executor,
    IdentityInsertStyle, InsertOptions, Prepares, Result, ReturningStyle, SqlBuilder,
    TableOrViewMetadata,
};
use std::sync::Arc;

/// An INSERT of one row, with optional identity override and a returning
/// projection where the dialect has one.
pub struct InsertCommand<'a> {
    ctx: SourceContext<'a>,
    table: Arc<TableOrViewMetadata>,
    values: Arguments,
    options: InsertOptions,
}

impl<'a> InsertCommand<'a> {
    pub(crate) fn new(
        ctx: SourceContext<'a>,
        table: Arc<TableOrViewMetadata>,
        values: Arguments,
    ) -> Self {
        Self {
            ctx,
            table,
            values,
            options: InsertOptions::default(),
        }
    }

    pub fn with_options(mut self, options: InsertOptions) -> Self {
        self.options = options;
        self
    }

    /// Run without materializing anything back.
    pub fn execute<E: Executor>(&self, executor: &mut E) -> Result<u64> {
        self.prepare(DesiredColumns::None)?.execute(executor)
    }
}

impl Prepares for InsertCommand<'_> {
    fn prepare(&self, desired: DesiredColumns<'_>) -> Result<ExecutionToken> {
        let dialect = self.ctx.dialect;
        let mut builder = SqlBuilder::new(&self.table, dialect, "insert");
        builder.apply_insert_values(&self.values, self.options)?;
        builder.apply_stamps(&self.ctx.audit.insert_stamps, true);
        builder.apply_desired_columns(desired)?;
        if builder.selected_count() > 0 && dialect.returning_style() == ReturningStyle::Unsupported {
            return Err(ChainError::validation(format!(
                "{} cannot return values from an INSERT; execute it and re-select by key",
                dialect.name()
            )));
        }
        let mut sql = String::new();
        builder.render_insert_statement(&mut sql, self.options)?;
        if self.options.identity_insert
            && dialect.identity_insert_style() == IdentityInsertStyle::SetIdentityInsert
        {
            sql = format!(
                "SET IDENTITY_INSERT {table} ON;\n{sql};\nSET IDENTITY_INSERT {table} OFF",
                table = self.table.quoted_name
            );
        }
        Ok(ExecutionToken {
            operation: "insert",
            target: self.table.name.to_string(),
            sql,
            parameters: builder.into_parameters(),
            command_type: CommandType::Text,
            expected_row_count: None,
            data_source: self.ctx.data_source.to_string(),
            listeners: self.ctx.listeners.clone(),
        })
    }
}
