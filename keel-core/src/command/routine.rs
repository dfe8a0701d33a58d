use super::SourceContext;
use crate::{
    Arguments, ChainError, CommandType, DesiredColumns, ExecutionToken, Executor, ObjectName,
    Prepares, ProcedureStyle, Result, SqlParameter,
};

fn collect_parameters(
    ctx: &SourceContext<'_>,
    out: &mut String,
    args: &Arguments,
    wrap: bool,
) -> Vec<SqlParameter> {
    let mut parameters = Vec::new();
    if wrap {
        out.push('(');
    }
    for (position, (name, value)) in args.iter().enumerate() {
        if position > 0 {
            out.push_str(", ");
        }
        ctx.dialect.write_parameter(out, name, position);
        parameters.push(SqlParameter {
            name: name.to_string(),
            value: value.clone(),
        });
    }
    if wrap {
        out.push(')');
    }
    parameters
}

fn quoted_object_name(ctx: &SourceContext<'_>, name: &ObjectName) -> String {
    match &name.schema {
        Some(schema) => format!(
            "{}.{}",
            ctx.dialect.quote_identifier(schema),
            ctx.dialect.quote_identifier(&name.name)
        ),
        None => ctx.dialect.quote_identifier(&name.name),
    }
}

/// A stored procedure invocation. The result shape is whatever the procedure
/// returns, so projection narrowing does not apply.
pub struct ProcedureCall<'a> {
    ctx: SourceContext<'a>,
    name: ObjectName,
    args: Arguments,
}

impl<'a> ProcedureCall<'a> {
    pub(crate) fn new(ctx: SourceContext<'a>, name: &str, args: Arguments) -> Self {
        Self {
            ctx,
            name: ObjectName::parse(name),
            args,
        }
    }

    pub fn execute<E: Executor>(&self, executor: &mut E) -> Result<u64> {
        self.prepare(DesiredColumns::None)?.execute(executor)
    }
}

impl Prepares for ProcedureCall<'_> {
    fn prepare(&self, _desired: DesiredColumns<'_>) -> Result<ExecutionToken> {
        let quoted = quoted_object_name(&self.ctx, &self.name);
        let mut sql = String::new();
        let parameters = match self.ctx.dialect.procedure_style() {
            ProcedureStyle::Unsupported => {
                return Err(ChainError::validation(format!(
                    "{} does not support stored procedures",
                    self.ctx.dialect.name()
                )));
            }
            ProcedureStyle::Exec => {
                sql.push_str("EXEC ");
                sql.push_str(&quoted);
                if !self.args.is_empty() {
                    sql.push(' ');
                }
                collect_parameters(&self.ctx, &mut sql, &self.args, false)
            }
            ProcedureStyle::Call => {
                sql.push_str("CALL ");
                sql.push_str(&quoted);
                collect_parameters(&self.ctx, &mut sql, &self.args, true)
            }
        };
        Ok(ExecutionToken {
            operation: "procedure",
            target: self.name.to_string(),
            sql,
            parameters,
            command_type: CommandType::Procedure,
            expected_row_count: None,
            data_source: self.ctx.data_source.to_string(),
            listeners: self.ctx.listeners.clone(),
        })
    }
}

/// `SELECT * FROM fn(args)` against a table-valued function. Without column
/// metadata for the function's shape the projection is always `*`; typed
/// materializers read the subset they need from the rows that come back.
pub struct TableFunctionQuery<'a> {
    ctx: SourceContext<'a>,
    name: ObjectName,
    args: Arguments,
}

impl<'a> TableFunctionQuery<'a> {
    pub(crate) fn new(ctx: SourceContext<'a>, name: &str, args: Arguments) -> Self {
        Self {
            ctx,
            name: ObjectName::parse(name),
            args,
        }
    }
}

impl Prepares for TableFunctionQuery<'_> {
    fn prepare(&self, _desired: DesiredColumns<'_>) -> Result<ExecutionToken> {
        let quoted = quoted_object_name(&self.ctx, &self.name);
        let mut sql = String::new();
        sql.push_str("SELECT *\nFROM ");
        sql.push_str(&quoted);
        let parameters = collect_parameters(&self.ctx, &mut sql, &self.args, true);
        Ok(ExecutionToken {
            operation: "table_function",
            target: self.name.to_string(),
            sql,
            parameters,
            command_type: CommandType::Text,
            expected_row_count: None,
            data_source: self.ctx.data_source.to_string(),
            listeners: self.ctx.listeners.clone(),
        })
    }
}
