use keel_core::{Dialect, LimitPlan, ProcedureStyle, UpsertStyle, ValueKind};
use std::fmt::Write;

/// MySQL surface: backtick quoting, plain LIMIT/OFFSET, ON DUPLICATE KEY
/// upserts, no in-statement returning channel.
pub struct MySqlDialect;

pub static MYSQL: MySqlDialect = MySqlDialect;

impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "MySQL"
    }

    fn write_identifier(&self, out: &mut String, value: &str) {
        out.push('`');
        self.write_escaped(out, value, '`', "``");
        out.push('`');
    }

    fn write_value_string(&self, out: &mut String, value: &str) {
        // Backslash is an escape character under default sql_mode.
        out.push('\'');
        for c in value.chars() {
            match c {
                '\'' => out.push_str("''"),
                '\\' => out.push_str("\\\\"),
                _ => out.push(c),
            }
        }
        out.push('\'');
    }

    // OFFSET is only legal inside a LIMIT clause; a skip without a take gets
    // the documented all-rows row count.
    fn write_limit_after_order_by(&self, out: &mut String, limits: &LimitPlan) {
        if let Some(skip) = limits.skip {
            let take = limits.take.unwrap_or(u64::MAX);
            let _ = write!(out, "\nLIMIT {}\nOFFSET {}", take, skip);
        } else if let Some(take) = limits.take {
            let _ = write!(out, "\nLIMIT {}", take);
        }
    }

    fn upsert_style(&self) -> UpsertStyle {
        UpsertStyle::OnDuplicateKey
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
            // tinyint(1) is the conventional boolean spelling.
            "tinyint" if native.to_ascii_lowercase().starts_with("tinyint(1)") => {
                Some(ValueKind::Boolean)
            }
            "bit" | "bool" | "boolean" => Some(ValueKind::Boolean),
            "tinyint" | "smallint" => Some(ValueKind::Int16),
            "mediumint" | "int" | "integer" => Some(ValueKind::Int32),
            "bigint" => Some(ValueKind::Int64),
            "float" => Some(ValueKind::Float32),
            "double" | "real" => Some(ValueKind::Float64),
            "decimal" | "numeric" => Some(ValueKind::Decimal),
            "char" | "varchar" | "tinytext" | "text" | "mediumtext" | "longtext" | "enum"
            | "set" | "json" => Some(ValueKind::Varchar),
            "binary" | "varbinary" | "tinyblob" | "blob" | "mediumblob" | "longblob" => {
                Some(ValueKind::Blob)
            }
            "date" => Some(ValueKind::Date),
            "time" => Some(ValueKind::Time),
            "datetime" | "timestamp" => Some(ValueKind::Timestamp),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_use_backticks() {
        assert_eq!(MYSQL.quote_identifier("or`der"), "`or``der`");
    }

    #[test]
    fn string_literals_escape_backslashes() {
        let mut out = String::new();
        MYSQL.write_value_string(&mut out, "C:\\it's");
        assert_eq!(out, "'C:\\\\it''s'");
    }

    #[test]
    fn skip_without_take_keeps_a_limit_clause() {
        let limits = LimitPlan {
            take: None,
            skip: Some(50),
            option: keel_core::LimitOption::Rows,
            seed: None,
            has_sort: true,
        };
        let mut out = String::new();
        MYSQL.write_limit_after_order_by(&mut out, &limits);
        assert_eq!(out, "\nLIMIT 18446744073709551615\nOFFSET 50");
    }

    #[test]
    fn tinyint_width_one_is_boolean() {
        assert_eq!(MYSQL.map_native_type("tinyint(1)"), Some(ValueKind::Boolean));
        assert_eq!(MYSQL.map_native_type("tinyint(4)"), Some(ValueKind::Int16));
        assert_eq!(MYSQL.map_native_type("geometry"), None);
    }
}
