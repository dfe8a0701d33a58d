use super::SourceContext;
use crate::{
    Arguments, ChainError, CommandType, DesiredColumns, ExecutionToken, Executor, Prepares, Result,
    ReturningStyle, SqlBuilder, TableOrViewMetadata, Tracked, UpdateOptions,
};
use std::sync::Arc;

/// An UPDATE of one row matched by key, with optional change-only SET lists
/// and old-value capture where the dialect can express it.
pub struct UpdateCommand<'a> {
    ctx: SourceContext<'a>,
    table: Arc<TableOrViewMetadata>,
    values: Arguments,
    /// The mutated subset, when the values came from a change-tracked set.
    changed: Option<Arguments>,
    options: UpdateOptions,
    key_columns: Option<Vec<String>>,
    expected_row_count: Option<u64>,
}

impl<'a> UpdateCommand<'a> {
    pub(crate) fn new(
        ctx: SourceContext<'a>,
        table: Arc<TableOrViewMetadata>,
        values: Arguments,
    ) -> Self {
        Self {
            ctx,
            table,
            values,
            changed: None,
            options: UpdateOptions::default(),
            key_columns: None,
            expected_row_count: None,
        }
    }

    pub(crate) fn from_tracked(
        ctx: SourceContext<'a>,
        table: Arc<TableOrViewMetadata>,
        tracked: &Tracked,
    ) -> Self {
        let mut command = Self::new(ctx, table, tracked.current().clone());
        command.changed = Some(tracked.changed());
        command.options = UpdateOptions::default().changed_properties_only();
        command
    }

    pub fn with_options(mut self, options: UpdateOptions) -> Self {
        self.options = options;
        self
    }

    /// Match rows on these columns instead of the primary key.
    pub fn with_key_columns(mut self, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.key_columns = Some(columns.into_iter().map(Into::into).collect());
        self.options = self.options.use_key_attribute();
        self
    }

    /// Fail unless the statement affects exactly this many rows.
    pub fn with_expected_row_count(mut self, expected: u64) -> Self {
        self.expected_row_count = Some(expected);
        self
    }

    pub fn execute<E: Executor>(&self, executor: &mut E) -> Result<u64> {
        self.prepare(DesiredColumns::None)?.execute(executor)
    }

    /// The SET source after change-tracking narrows it: the mutated fields
    /// plus the key values needed to match the row.
    fn effective_values(&self) -> Result<Arguments> {
        if !self.options.changed_properties_only {
            return Ok(self.values.clone());
        }
        let Some(changed) = &self.changed else {
            return Err(ChainError::validation(
                "changed_properties_only requires a change-tracked argument set",
            ));
        };
        if changed.is_empty() {
            return Err(ChainError::validation(format!(
                "update: no property of {} was changed",
                self.table.name
            )));
        }
        let mut effective = changed.clone();
        for column in &self.table.columns {
            if !column.is_primary_key {
                continue;
            }
            if let Some(value) = self
                .values
                .get(&column.sql_name)
                .or_else(|| self.values.get(&column.rust_name))
            {
                if !effective.contains(&column.sql_name) {
                    effective.insert(column.sql_name.clone(), value.clone());
                }
            }
        }
        Ok(effective)
    }
}

impl Prepares for UpdateCommand<'_> {
    fn prepare(&self, desired: DesiredColumns<'_>) -> Result<ExecutionToken> {
        let dialect = self.ctx.dialect;
        let values = self.effective_values()?;
        let mut builder = SqlBuilder::new(&self.table, dialect, "update");
        builder.apply_update_values(&values, self.options, self.key_columns.as_deref())?;
        builder.apply_stamps(&self.ctx.audit.update_stamps, false);
        builder.apply_desired_columns(desired)?;

        let style = dialect.returning_style();
        if builder.selected_count() > 0 && style == ReturningStyle::Unsupported {
            return Err(ChainError::validation(format!(
                "{} cannot return values from an UPDATE; execute it and re-select by key",
                dialect.name()
            )));
        }
        if self.options.return_old_values
            && builder.selected_count() > 0
            && style != ReturningStyle::Output
        {
            return Err(ChainError::validation(format!(
                "{} can only return post-update values",
                dialect.name()
            )));
        }

        let mut sql = String::new();
        sql.push_str("UPDATE ");
        sql.push_str(&self.table.quoted_name);
        sql.push('\n');
        builder.render_set_clause(&mut sql)?;
        if builder.selected_count() > 0 && style == ReturningStyle::Output {
            sql.push_str("\nOUTPUT ");
            let prefix = if self.options.return_old_values {
                "Deleted."
            } else {
                "Inserted."
            };
            builder.render_selected_columns(&mut sql, prefix);
        }
        sql.push_str("\nWHERE ");
        builder.render_key_predicate(&mut sql)?;
        if builder.selected_count() > 0 && style == ReturningStyle::Returning {
            sql.push_str("\nRETURNING ");
            builder.render_selected_columns(&mut sql, "");
        }

        Ok(ExecutionToken {
            operation: "update",
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
