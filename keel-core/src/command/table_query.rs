use super::SourceContext;
use crate::{
    Arguments, ChainError, CommandType, DesiredColumns, ExecutionToken, FilterOptions, LimitOption,
    LimitPlan, Prepares, Result, SortExpression, SqlBuilder, TableOrViewMetadata, Value,
};
use std::sync::Arc;

/// Where a query's WHERE clause comes from. The three sources are mutually
/// exclusive; assigning one discards the others.
enum FilterSource {
    None,
    Keys(Vec<Value>),
    Filter {
        filter: Arguments,
        options: FilterOptions,
    },
    WhereClause {
        clause: String,
        args: Arguments,
    },
}

/// A read against one table or view: optional filter, sorting and limits,
/// terminated by a materializer shape.
pub struct TableQuery<'a> {
    ctx: SourceContext<'a>,
    operation: &'static str,
    table: Arc<TableOrViewMetadata>,
    filter: FilterSource,
    sorts: Vec<SortExpression>,
    skip: Option<u64>,
    take: Option<u64>,
    limit_option: LimitOption,
    seed: Option<i64>,
}

impl<'a> TableQuery<'a> {
    pub(crate) fn new(ctx: SourceContext<'a>, table: Arc<TableOrViewMetadata>) -> Self {
        Self {
            ctx,
            operation: "from",
            table,
            filter: FilterSource::None,
            sorts: Vec::new(),
            skip: None,
            take: None,
            limit_option: LimitOption::default(),
            seed: None,
        }
    }

    pub(crate) fn by_keys(
        ctx: SourceContext<'a>,
        table: Arc<TableOrViewMetadata>,
        keys: Vec<Value>,
    ) -> Self {
        let mut query = Self::new(ctx, table);
        query.operation = "get_by_key";
        query.filter = FilterSource::Keys(keys);
        query
    }

    /// Match rows by column equality. Replaces any previous filter or where
    /// clause.
    pub fn with_filter(mut self, filter: Arguments, options: FilterOptions) -> Self {
        self.filter = FilterSource::Filter { filter, options };
        self
    }

    /// Splice a caller-authored predicate after WHERE, with its parameters.
    /// Replaces any previous filter.
    pub fn with_where(mut self, clause: impl Into<String>, args: Arguments) -> Self {
        self.filter = FilterSource::WhereClause {
            clause: clause.into(),
            args,
        };
        self
    }

    pub fn with_sorting(
        mut self,
        sorts: impl IntoIterator<Item = impl Into<SortExpression>>,
    ) -> Self {
        self.sorts = sorts.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_limits(mut self, skip: Option<u64>, take: Option<u64>) -> Self {
        self.skip = skip;
        self.take = take;
        self
    }

    pub fn with_limit_option(mut self, option: LimitOption) -> Self {
        self.limit_option = option;
        self
    }

    /// Repeatable-sampling seed; only meaningful with a sampling limit option.
    pub fn with_seed(mut self, seed: i64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn validate_limits(&self) -> Result<Option<LimitPlan>> {
        let dialect = self.ctx.dialect;
        if self.take == Some(0) {
            return Err(ChainError::validation(format!(
                "{}: a take of zero rows can never return data",
                self.operation
            )));
        }
        if self.seed.is_some() && !self.limit_option.is_sampling() {
            return Err(ChainError::validation(format!(
                "{}: a sampling seed requires a table-sample limit option",
                self.operation
            )));
        }
        if self.limit_option.requires_sort() && self.sorts.is_empty() {
            return Err(ChainError::validation(format!(
                "{}: with-ties limits require a sort order",
                self.operation
            )));
        }
        let skip = self.skip.filter(|s| *s > 0);
        if self.take.is_none() && skip.is_none() {
            return Ok(None);
        }
        if !dialect.supports_limit_option(self.limit_option) {
            return Err(ChainError::validation(format!(
                "{} does not support the {:?} limit option",
                dialect.name(),
                self.limit_option
            )));
        }
        if let Some(skip) = skip {
            if !dialect.supports_offset() {
                return Err(ChainError::validation(format!(
                    "{} cannot skip rows",
                    dialect.name()
                )));
            }
            if self.sorts.is_empty() {
                return Err(ChainError::validation(format!(
                    "{}: skipping {} rows without a sort order is nondeterministic",
                    self.operation, skip
                )));
            }
            if self.limit_option != LimitOption::Rows {
                return Err(ChainError::validation(format!(
                    "{}: skip can only be combined with a plain row limit",
                    self.operation
                )));
            }
        }
        Ok(Some(LimitPlan {
            take: self.take,
            skip,
            option: self.limit_option,
            seed: self.seed,
            has_sort: !self.sorts.is_empty(),
        }))
    }
}

impl Prepares for TableQuery<'_> {
    fn prepare(&self, desired: DesiredColumns<'_>) -> Result<ExecutionToken> {
        let limits = self.validate_limits()?;
        let mut builder = SqlBuilder::new(&self.table, self.ctx.dialect, self.operation);
        match &self.filter {
            FilterSource::None | FilterSource::WhereClause { .. } => {}
            FilterSource::Keys(keys) => builder.apply_key_values(keys)?,
            FilterSource::Filter { filter, options } => {
                builder.apply_filter_value(filter, *options)?
            }
        }
        builder.apply_desired_columns(desired)?;

        let mut sql = String::new();
        builder.render_select_clause(&mut sql, limits.as_ref());
        sql.push_str("\nFROM ");
        sql.push_str(&self.table.quoted_name);
        if let Some(limits) = &limits {
            builder.write_table_sample(&mut sql, limits);
        }

        let mut predicate = String::new();
        match &self.filter {
            FilterSource::None => {}
            FilterSource::Keys(_) => builder.render_key_predicate(&mut predicate)?,
            FilterSource::Filter { .. } => builder.render_filter_predicate(&mut predicate),
            FilterSource::WhereClause { clause, args } => {
                predicate.push_str(clause);
                builder.append_where_clause_parameters(args)?;
            }
        }
        if let Some(rule) = self.ctx.audit.soft_delete() {
            let mut alive = String::new();
            if builder.render_soft_delete_predicate(&mut alive, rule) {
                if predicate.is_empty() {
                    predicate = alive;
                } else {
                    predicate = format!("({}) AND {}", predicate, alive);
                }
            }
        }
        if !predicate.is_empty() {
            sql.push_str("\nWHERE ");
            sql.push_str(&predicate);
        }
        builder.render_order_by_clause(&mut sql, &self.sorts)?;
        if let Some(limits) = &limits {
            self.ctx.dialect.write_limit_after_order_by(&mut sql, limits);
        }

        Ok(ExecutionToken {
            operation: self.operation,
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
