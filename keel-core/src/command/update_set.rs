use super::SourceContext;
use crate::{
    Arguments, CommandType, DesiredColumns, ExecutionToken, Executor, FilterOptions, Prepares,
    Result, SqlBuilder, TableOrViewMetadata,
};
use std::sync::Arc;

/// An UPDATE whose SET list is one argument set and whose row scope is a
/// filter or where clause, touching many rows at once. With no predicate the
/// statement updates the whole table, which is loud but legal.
pub struct UpdateSetCommand<'a> {
    ctx: SourceContext<'a>,
    table: Arc<TableOrViewMetadata>,
    new_values: Arguments,
    filter: Option<(Arguments, FilterOptions)>,
    where_clause: Option<(String, Arguments)>,
    expected_row_count: Option<u64>,
}

impl<'a> UpdateSetCommand<'a> {
    pub(crate) fn new(
        ctx: SourceContext<'a>,
        table: Arc<TableOrViewMetadata>,
        new_values: Arguments,
    ) -> Self {
        Self {
            ctx,
            table,
            new_values,
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

impl Prepares for UpdateSetCommand<'_> {
    fn prepare(&self, _desired: DesiredColumns<'_>) -> Result<ExecutionToken> {
        // A name bound both as a SET value and a where-clause parameter would
        // silently bind one value into both places; fail before rendering.
        if let Some((_, args)) = &self.where_clause {
            SqlBuilder::check_for_overlaps(&self.new_values, args, "update_set")?;
        }
        let mut builder = SqlBuilder::new(&self.table, self.ctx.dialect, "update_set");
        builder.apply_set_values(&self.new_values)?;
        if let Some((filter, options)) = &self.filter {
            builder.apply_filter_value(filter, *options)?;
        }
        if self.filter.is_none() && self.where_clause.is_none() {
            log::warn!(
                "update_set on {} has no filter and will touch every row",
                self.table.name
            );
        }

        let mut sql = String::new();
        sql.push_str("UPDATE ");
        sql.push_str(&self.table.quoted_name);
        sql.push('\n');
        builder.render_set_clause(&mut sql)?;
        if self.filter.is_some() {
            sql.push_str("\nWHERE ");
            builder.render_filter_predicate(&mut sql);
        } else if let Some((clause, args)) = &self.where_clause {
            sql.push_str("\nWHERE ");
            sql.push_str(clause);
            builder.append_where_clause_parameters(args)?;
        }

        Ok(ExecutionToken {
            operation: "update_set",
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
