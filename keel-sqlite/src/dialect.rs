use keel_core::{Dialect, LimitPlan, ReturningStyle, UpsertStyle, ValueKind};
use std::fmt::Write;

/// SQLite surface: double-quote quoting, plain LIMIT/OFFSET, RETURNING and
/// ON CONFLICT upserts, no stored procedures. Type mapping follows SQLite's
/// affinity rules rather than exact names.
pub struct SqliteDialect;

pub static SQLITE: SqliteDialect = SqliteDialect;

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "SQLite"
    }

    // OFFSET requires an enclosing LIMIT clause; -1 is the engine's spelling
    // for "no cap".
    fn write_limit_after_order_by(&self, out: &mut String, limits: &LimitPlan) {
        if let Some(skip) = limits.skip {
            match limits.take {
                Some(take) => {
                    let _ = write!(out, "\nLIMIT {}\nOFFSET {}", take, skip);
                }
                None => {
                    let _ = write!(out, "\nLIMIT -1\nOFFSET {}", skip);
                }
            }
        } else if let Some(take) = limits.take {
            let _ = write!(out, "\nLIMIT {}", take);
        }
    }

    fn upsert_style(&self) -> UpsertStyle {
        UpsertStyle::OnConflict
    }

    fn returning_style(&self) -> ReturningStyle {
        ReturningStyle::Returning
    }

    fn map_native_type(&self, native: &str) -> Option<ValueKind> {
        let declared = native.to_ascii_lowercase();
        // Declared types are free-form; substring affinity matching is what
        // the engine itself does.
        if declared.is_empty() || declared.contains("blob") {
            return Some(ValueKind::Blob);
        }
        if declared.contains("bool") {
            return Some(ValueKind::Boolean);
        }
        if declared.contains("int") {
            return Some(ValueKind::Int64);
        }
        if declared.contains("char") || declared.contains("clob") || declared.contains("text") {
            return Some(ValueKind::Varchar);
        }
        if declared.contains("real") || declared.contains("floa") || declared.contains("doub") {
            return Some(ValueKind::Float64);
        }
        if declared.contains("decimal") || declared.contains("numeric") {
            return Some(ValueKind::Decimal);
        }
        if declared.contains("datetime") || declared.contains("timestamp") {
            return Some(ValueKind::Timestamp);
        }
        if declared.contains("date") {
            return Some(ValueKind::Date);
        }
        if declared.contains("time") {
            return Some(ValueKind::Time);
        }
        if declared.contains("uuid") || declared.contains("guid") {
            return Some(ValueKind::Uuid);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn affinity_matching_covers_declared_types() {
        assert_eq!(SQLITE.map_native_type("INTEGER"), Some(ValueKind::Int64));
        assert_eq!(SQLITE.map_native_type("BIGINT"), Some(ValueKind::Int64));
        assert_eq!(SQLITE.map_native_type("VARCHAR(30)"), Some(ValueKind::Varchar));
        assert_eq!(SQLITE.map_native_type("DATETIME"), Some(ValueKind::Timestamp));
        assert_eq!(SQLITE.map_native_type(""), Some(ValueKind::Blob));
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
        SQLITE.write_limit_after_order_by(&mut out, &limits);
        assert_eq!(out, "\nLIMIT -1\nOFFSET 50");
    }

    #[test]
    fn booleans_beat_the_int_substring() {
        assert_eq!(SQLITE.map_native_type("BOOLEAN"), Some(ValueKind::Boolean));
    }
}
