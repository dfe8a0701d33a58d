use super::SourceContext;
use crate::{
    Arguments, ChainError, CommandType, DesiredColumns, ExecutionToken, Executor, InsertOptions,
    Prepares, Result, ReturningStyle, SqlBuilder, TableOrViewMetadata, UpsertStyle,
};
use std::sync::Arc;

/// Insert-or-update of one row keyed on the primary key, rendered in
/// whichever native shape the backend has (ON CONFLICT, ON DUPLICATE KEY,
/// MERGE).
pub struct UpsertCommand<'a> {
    ctx: SourceContext<'a>,
    table: Arc<TableOrViewMetadata>,
    values: Arguments,
    options: InsertOptions,
}

impl<'a> UpsertCommand<'a> {
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

    pub fn execute<E: Executor>(&self, executor: &mut E) -> Result<u64> {
        self.prepare(DesiredColumns::None)?.execute(executor)
    }
}

impl Prepares for UpsertCommand<'_> {
    fn prepare(&self, desired: DesiredColumns<'_>) -> Result<ExecutionToken> {
        let dialect = self.ctx.dialect;
        // The match condition is the primary key, so key values must survive
        // identity stripping.
        let options = if self.table.identity_column().is_some_and(|c| c.is_primary_key) {
            self.options.identity_insert()
        } else {
            self.options
        };
        let mut builder = SqlBuilder::new(&self.table, dialect, "upsert");
        builder.apply_insert_values(&self.values, options)?;
        builder.apply_stamps(&self.ctx.audit.insert_stamps, true);
        builder.apply_desired_columns(desired)?;
        if builder.selected_count() > 0 {
            let can_return = match dialect.upsert_style() {
                UpsertStyle::OnConflict => dialect.returning_style() == ReturningStyle::Returning,
                UpsertStyle::Merge => dialect.returning_style() == ReturningStyle::Output,
                _ => false,
            };
            if !can_return {
                return Err(ChainError::validation(format!(
                    "{} cannot return values from an upsert",
                    dialect.name()
                )));
            }
        }
        let mut sql = String::new();
        builder.render_upsert_statement(&mut sql, options)?;
        if options.identity_insert
            && dialect.identity_insert_style() == crate::IdentityInsertStyle::SetIdentityInsert
        {
            sql = format!(
                "SET IDENTITY_INSERT {table} ON;\n{sql}\nSET IDENTITY_INSERT {table} OFF",
                table = self.table.quoted_name
            );
        }
        Ok(ExecutionToken {
            operation: "upsert",
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
