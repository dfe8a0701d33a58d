use keel_core::{
    Dialect, IdentityInsertStyle, LimitOption, LimitPlan, ProcedureStyle, ReturningStyle,
    UpsertStyle, ValueKind,
};
use std::fmt::Write;

/// PostgreSQL surface: double-quote quoting, LIMIT/OFFSET with WITH TIES,
/// TABLESAMPLE SYSTEM, RETURNING and ON CONFLICT upserts.
pub struct PostgresDialect;

pub static POSTGRES: PostgresDialect = PostgresDialect;

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "PostgreSQL"
    }

    fn supports_limit_option(&self, option: LimitOption) -> bool {
        matches!(
            option,
            LimitOption::Rows
                | LimitOption::RowsWithTies
                | LimitOption::TableSampleSystemPercentage
        )
    }

    fn write_table_sample(&self, out: &mut String, limits: &LimitPlan) {
        if limits.option != LimitOption::TableSampleSystemPercentage {
            return;
        }
        let Some(take) = limits.take else {
            return;
        };
        let _ = write!(out, " TABLESAMPLE SYSTEM ({})", take);
        if let Some(seed) = limits.seed {
            let _ = write!(out, " REPEATABLE ({})", seed);
        }
    }

    fn write_limit_after_order_by(&self, out: &mut String, limits: &LimitPlan) {
        if limits.option.is_sampling() {
            return;
        }
        if limits.option == LimitOption::RowsWithTies {
            if let Some(take) = limits.take {
                let _ = write!(out, "\nFETCH FIRST {} ROWS WITH TIES", take);
            }
            return;
        }
        if let Some(take) = limits.take {
            let _ = write!(out, "\nLIMIT {}", take);
        }
        if let Some(skip) = limits.skip {
            let _ = write!(out, "\nOFFSET {}", skip);
        }
    }

    fn upsert_style(&self) -> UpsertStyle {
        UpsertStyle::OnConflict
    }

    fn returning_style(&self) -> ReturningStyle {
        ReturningStyle::Returning
    }

    fn identity_insert_style(&self) -> IdentityInsertStyle {
        IdentityInsertStyle::Overriding
    }

    fn procedure_style(&self) -> ProcedureStyle {
        ProcedureStyle::Call
    }

    fn map_native_type(&self, native: &str) -> Option<ValueKind> {
        let base = native
            .split('(')
            .next()
            .unwrap_or(native)
            .trim()
            .to_ascii_lowercase();
        match base.as_str() {
            "boolean" | "bool" => Some(ValueKind::Boolean),
            "smallint" | "int2" | "smallserial" => Some(ValueKind::Int16),
            "integer" | "int" | "int4" | "serial" => Some(ValueKind::Int32),
            "bigint" | "int8" | "bigserial" => Some(ValueKind::Int64),
            "real" | "float4" => Some(ValueKind::Float32),
            "double precision" | "float8" => Some(ValueKind::Float64),
            "numeric" | "decimal" | "money" => Some(ValueKind::Decimal),
            "text" | "varchar" | "character varying" | "character" | "char" | "bpchar"
            | "name" | "citext" | "json" | "jsonb" | "xml" => Some(ValueKind::Varchar),
            "bytea" => Some(ValueKind::Blob),
            "date" => Some(ValueKind::Date),
            "time" | "time without time zone" => Some(ValueKind::Time),
            "timestamp" | "timestamp without time zone" => Some(ValueKind::Timestamp),
            "timestamptz" | "timestamp with time zone" => Some(ValueKind::TimestampWithTimezone),
            "uuid" => Some(ValueKind::Uuid),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_use_double_quotes() {
        assert_eq!(POSTGRES.quote_identifier("Order\"Line"), "\"Order\"\"Line\"");
    }

    #[test]
    fn with_ties_renders_as_fetch_first() {
        let limits = LimitPlan {
            take: Some(3),
            skip: None,
            option: LimitOption::RowsWithTies,
            seed: None,
            has_sort: true,
        };
        let mut out = String::new();
        POSTGRES.write_limit_after_order_by(&mut out, &limits);
        assert_eq!(out, "\nFETCH FIRST 3 ROWS WITH TIES");
    }

    #[test]
    fn sampling_with_seed_is_repeatable() {
        let limits = LimitPlan {
            take: Some(10),
            skip: None,
            option: LimitOption::TableSampleSystemPercentage,
            seed: Some(7),
            has_sort: false,
        };
        let mut out = String::new();
        POSTGRES.write_table_sample(&mut out, &limits);
        assert_eq!(out, " TABLESAMPLE SYSTEM (10) REPEATABLE (7)");
        POSTGRES.write_limit_after_order_by(&mut out, &limits);
        assert_eq!(out, " TABLESAMPLE SYSTEM (10) REPEATABLE (7)");
    }

    #[test]
    fn native_types_cover_aliases() {
        assert_eq!(POSTGRES.map_native_type("int4"), Some(ValueKind::Int32));
        assert_eq!(
            POSTGRES.map_native_type("timestamp with time zone"),
            Some(ValueKind::TimestampWithTimezone)
        );
        assert_eq!(POSTGRES.map_native_type("tsvector"), None);
    }
}
