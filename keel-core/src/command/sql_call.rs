use super::SourceContext;
use crate::{
    Arguments, CommandType, DesiredColumns, ExecutionToken, Executor, Prepares, Result,
    SqlParameter,
};

/// Caller-authored SQL with named arguments, escaping the builders entirely
/// while keeping the execution and materialization pipeline.
pub struct SqlCall<'a> {
    ctx: SourceContext<'a>,
    sql: String,
    args: Arguments,
}

impl<'a> SqlCall<'a> {
    pub(crate) fn new(ctx: SourceContext<'a>, sql: impl Into<String>, args: Arguments) -> Self {
        Self {
            ctx,
            sql: sql.into(),
            args,
        }
    }

    pub fn execute<E: Executor>(&self, executor: &mut E) -> Result<u64> {
        self.prepare(DesiredColumns::None)?.execute(executor)
    }
}

impl Prepares for SqlCall<'_> {
    fn prepare(&self, _desired: DesiredColumns<'_>) -> Result<ExecutionToken> {
        let parameters = self
            .args
            .iter()
            .map(|(name, value)| SqlParameter {
                name: name.to_string(),
                value: value.clone(),
            })
            .collect();
        Ok(ExecutionToken {
            operation: "sql",
            // Events carry the statement in their sql field; the target stays
            // a short label.
            target: "sql".to_string(),
            sql: self.sql.clone(),
            parameters,
            command_type: CommandType::Text,
            expected_row_count: None,
            data_source: self.ctx.data_source.to_string(),
            listeners: self.ctx.listeners.clone(),
        })
    }
}
