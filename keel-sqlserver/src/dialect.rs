use keel_core::{
    Dialect, IdentityInsertStyle, LimitOption, LimitPlan, ProcedureStyle, ReturningStyle,
    UpsertStyle, ValueKind,
};
use std::fmt::Write;

/// Transact-SQL surface: bracket quoting, the TOP / OFFSET-FETCH limit
/// family, OUTPUT clauses and MERGE upserts.
pub struct SqlServerDialect;

pub static SQL_SERVER: SqlServerDialect = SqlServerDialect;

impl Dialect for SqlServerDialect {
    fn name(&self) -> &'static str {
        "SQL Server"
    }

    fn write_identifier(&self, out: &mut String, value: &str) {
        out.push('[');
        self.write_escaped(out, value, ']', "]]");
        out.push(']');
    }

    fn write_value_bool(&self, out: &mut String, value: bool) {
        // BIT has no TRUE/FALSE literals.
        out.push(['0', '1'][value as usize]);
    }

    fn supports_limit_option(&self, _option: LimitOption) -> bool {
        true
    }

    fn write_limit_before_columns(&self, out: &mut String, limits: &LimitPlan) {
        if limits.skip.is_some() || limits.option.is_sampling() {
            return;
        }
        let Some(take) = limits.take else {
            return;
        };
        let _ = match limits.option {
            LimitOption::Rows => write!(out, "TOP ({}) ", take),
            LimitOption::RowsWithTies => write!(out, "TOP ({}) WITH TIES ", take),
            LimitOption::Percentage => write!(out, "TOP ({}) PERCENT ", take),
            LimitOption::PercentageWithTies => write!(out, "TOP ({}) PERCENT WITH TIES ", take),
            _ => Ok(()),
        };
    }

    fn write_table_sample(&self, out: &mut String, limits: &LimitPlan) {
        let Some(take) = limits.take else {
            return;
        };
        let _ = match limits.option {
            LimitOption::TableSampleSystemRows => {
                write!(out, " TABLESAMPLE SYSTEM ({} ROWS)", take)
            }
            LimitOption::TableSampleSystemPercentage => {
                write!(out, " TABLESAMPLE SYSTEM ({} PERCENT)", take)
            }
            _ => return,
        };
        if let Some(seed) = limits.seed {
            let _ = write!(out, " REPEATABLE ({})", seed);
        }
    }

    fn write_limit_after_order_by(&self, out: &mut String, limits: &LimitPlan) {
        // Take-only limits went out as TOP; only the skip path lands here.
        if let Some(skip) = limits.skip {
            let _ = write!(out, "\nOFFSET {} ROWS", skip);
            if let Some(take) = limits.take {
                let _ = write!(out, "\nFETCH NEXT {} ROWS ONLY", take);
            }
        }
    }

    fn upsert_style(&self) -> UpsertStyle {
        UpsertStyle::Merge
    }

    fn returning_style(&self) -> ReturningStyle {
        ReturningStyle::Output
    }

    fn identity_insert_style(&self) -> IdentityInsertStyle {
        IdentityInsertStyle::SetIdentityInsert
    }

    fn procedure_style(&self) -> ProcedureStyle {
        ProcedureStyle::Exec
    }

    fn map_native_type(&self, native: &str) -> Option<ValueKind> {
        let base = native
            .split('(')
            .next()
            .unwrap_or(native)
            .trim()
            .to_ascii_lowercase();
        match base.as_str() {
            "bit" => Some(ValueKind::Boolean),
            "tinyint" | "smallint" => Some(ValueKind::Int16),
            "int" => Some(ValueKind::Int32),
            "bigint" => Some(ValueKind::Int64),
            "real" => Some(ValueKind::Float32),
            "float" => Some(ValueKind::Float64),
            "decimal" | "numeric" | "money" | "smallmoney" => Some(ValueKind::Decimal),
            "char" | "varchar" | "text" | "nchar" | "nvarchar" | "ntext" | "xml" | "sysname" => {
                Some(ValueKind::Varchar)
            }
            "binary" | "varbinary" | "image" | "rowversion" => Some(ValueKind::Blob),
            "date" => Some(ValueKind::Date),
            "time" => Some(ValueKind::Time),
            "datetime" | "datetime2" | "smalldatetime" => Some(ValueKind::Timestamp),
            "datetimeoffset" => Some(ValueKind::TimestampWithTimezone),
            "uniqueidentifier" => Some(ValueKind::Uuid),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brackets_escape_embedded_closers() {
        assert_eq!(SQL_SERVER.quote_identifier("We]ird"), "[We]]ird]");
    }

    #[test]
    fn top_renders_before_the_column_list() {
        let limits = LimitPlan {
            take: Some(10),
            skip: None,
            option: LimitOption::PercentageWithTies,
            seed: None,
            has_sort: true,
        };
        let mut out = String::new();
        SQL_SERVER.write_limit_before_columns(&mut out, &limits);
        assert_eq!(out, "TOP (10) PERCENT WITH TIES ");
        out.clear();
        SQL_SERVER.write_limit_after_order_by(&mut out, &limits);
        assert_eq!(out, "");
    }

    #[test]
    fn skip_switches_to_offset_fetch() {
        let limits = LimitPlan {
            take: Some(25),
            skip: Some(50),
            option: LimitOption::Rows,
            seed: None,
            has_sort: true,
        };
        let mut out = String::new();
        SQL_SERVER.write_limit_before_columns(&mut out, &limits);
        assert_eq!(out, "");
        SQL_SERVER.write_limit_after_order_by(&mut out, &limits);
        assert_eq!(out, "\nOFFSET 50 ROWS\nFETCH NEXT 25 ROWS ONLY");
    }

    #[test]
    fn sampling_lands_after_the_from_clause() {
        let limits = LimitPlan {
            take: Some(5),
            skip: None,
            option: LimitOption::TableSampleSystemPercentage,
            seed: Some(42),
            has_sort: false,
        };
        let mut out = String::new();
        SQL_SERVER.write_table_sample(&mut out, &limits);
        assert_eq!(out, " TABLESAMPLE SYSTEM (5 PERCENT) REPEATABLE (42)");
    }

    #[test]
    fn native_types_map_with_length_suffixes() {
        assert_eq!(SQL_SERVER.map_native_type("nvarchar(50)"), Some(ValueKind::Varchar));
        assert_eq!(SQL_SERVER.map_native_type("DATETIME2"), Some(ValueKind::Timestamp));
        assert_eq!(SQL_SERVER.map_native_type("geography"), None);
    }
}
