use crate::{LimitOption, Value, ValueKind};
use std::fmt::Write;

/// How a backend expresses insert-or-update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertStyle {
    /// `INSERT ... ON CONFLICT (keys) DO UPDATE SET c = EXCLUDED.c`
    OnConflict,
    /// `INSERT ... ON DUPLICATE KEY UPDATE c = VALUES(c)`
    OnDuplicateKey,
    /// `MERGE INTO ... USING ... WHEN (NOT) MATCHED`
    Merge,
    Unsupported,
}

/// How a backend returns generated values from a modify statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturningStyle {
    /// `RETURNING c1, c2` suffix.
    Returning,
    /// `OUTPUT Inserted.c1, Inserted.c2` before the VALUES clause.
    Output,
    /// No in-statement channel; callers rely on the executor's last-insert-id.
    Unsupported,
}

/// How a backend admits an explicit value for an identity column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityInsertStyle {
    /// Listing the column is enough.
    Include,
    /// `OVERRIDING SYSTEM VALUE` between the column list and VALUES.
    Overriding,
    /// Statement must be wrapped in `SET IDENTITY_INSERT t ON/OFF`.
    SetIdentityInsert,
    Unsupported,
}

/// How stored procedures are invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcedureStyle {
    /// `EXEC name @a, @b`
    Exec,
    /// `CALL name(@a, @b)`
    Call,
    Unsupported,
}

/// The validated pagination intent handed to a dialect for rendering.
/// Command builders guarantee the combination is legal for the dialect before
/// any of the `write_limit_*` hooks run.
#[derive(Debug, Clone, Copy)]
pub struct LimitPlan {
    pub take: Option<u64>,
    pub skip: Option<u64>,
    pub option: LimitOption,
    pub seed: Option<i64>,
    pub has_sort: bool,
}

/// One backend's SQL surface: quoting, parameter naming, literal rendering,
/// pagination and the capability matrix.
///
/// The builder machinery is dialect-agnostic in structure; everything
/// backend-specific funnels through this trait, so each backend is one small
/// adapter rather than a full builder reimplementation. Default methods carry
/// the ANSI-flavored behavior shared by most backends.
pub trait Dialect: Send + Sync {
    fn name(&self) -> &'static str;

    /// Escape every occurrence of `search` in `value` with `replace`.
    fn write_escaped(&self, out: &mut String, value: &str, search: char, replace: &str) {
        let mut position = 0;
        for (i, c) in value.char_indices() {
            if c == search {
                out.push_str(&value[position..i]);
                out.push_str(replace);
                position = i + 1;
            }
        }
        out.push_str(&value[position..]);
    }

    fn write_identifier(&self, out: &mut String, value: &str) {
        out.push('"');
        self.write_escaped(out, value, '"', r#""""#);
        out.push('"');
    }

    fn quote_identifier(&self, value: &str) -> String {
        let mut out = String::with_capacity(value.len() + 2);
        self.write_identifier(&mut out, value);
        out
    }

    /// `true` when parameters are positional `?` markers instead of named.
    fn positional_parameters(&self) -> bool {
        false
    }

    /// Write a parameter placeholder. `ordinal` is the zero-based position of
    /// the parameter in the command's parameter list.
    fn write_parameter(&self, out: &mut String, name: &str, ordinal: usize) {
        let _ = ordinal;
        out.push('@');
        out.push_str(name);
    }

    /// Write a literal value. Only used where a parameter slot is not
    /// available (soft-delete constants, sampling seeds, limit numerals).
    fn write_value(&self, out: &mut String, value: &Value) {
        match value {
            v if v.is_null() => out.push_str("NULL"),
            Value::Boolean(Some(v)) => self.write_value_bool(out, *v),
            Value::Int16(Some(v)) => out.push_str(itoa::Buffer::new().format(*v)),
            Value::Int32(Some(v)) => out.push_str(itoa::Buffer::new().format(*v)),
            Value::Int64(Some(v)) => out.push_str(itoa::Buffer::new().format(*v)),
            Value::Float32(Some(v)) => out.push_str(ryu::Buffer::new().format(*v)),
            Value::Float64(Some(v)) => out.push_str(ryu::Buffer::new().format(*v)),
            Value::Decimal(Some(v), ..) => {
                let _ = write!(out, "{}", v);
            }
            Value::Varchar(Some(v)) => self.write_value_string(out, v),
            Value::Blob(Some(v)) => self.write_value_blob(out, v),
            Value::Date(Some(v)) => {
                let _ = write!(
                    out,
                    "'{:04}-{:02}-{:02}'",
                    v.year(),
                    v.month() as u8,
                    v.day()
                );
            }
            Value::Time(Some(v)) => {
                let _ = write!(out, "'{:02}:{:02}:{:02}'", v.hour(), v.minute(), v.second());
            }
            Value::Timestamp(Some(v)) => {
                let _ = write!(
                    out,
                    "'{:04}-{:02}-{:02} {:02}:{:02}:{:02}'",
                    v.year(),
                    v.month() as u8,
                    v.day(),
                    v.hour(),
                    v.minute(),
                    v.second()
                );
            }
            Value::TimestampWithTimezone(Some(v)) => {
                let offset = v.offset();
                let _ = write!(
                    out,
                    "'{:04}-{:02}-{:02} {:02}:{:02}:{:02}{:+03}:{:02}'",
                    v.year(),
                    v.month() as u8,
                    v.day(),
                    v.hour(),
                    v.minute(),
                    v.second(),
                    offset.whole_hours(),
                    offset.minutes_past_hour().abs()
                );
            }
            Value::Uuid(Some(v)) => {
                let _ = write!(out, "'{}'", v);
            }
            _ => unreachable!("null variants handled above"),
        }
    }

    fn write_value_bool(&self, out: &mut String, value: bool) {
        out.push_str(["false", "true"][value as usize]);
    }

    fn write_value_string(&self, out: &mut String, value: &str) {
        out.push('\'');
        self.write_escaped(out, value, '\'', "''");
        out.push('\'');
    }

    fn write_value_blob(&self, out: &mut String, value: &[u8]) {
        out.push_str("X'");
        for b in value {
            let _ = write!(out, "{:02X}", b);
        }
        out.push('\'');
    }

    fn supports_limit_option(&self, option: LimitOption) -> bool {
        matches!(option, LimitOption::Rows)
    }

    /// `false` when the backend has no OFFSET equivalent (skip is rejected at
    /// prepare time).
    fn supports_offset(&self) -> bool {
        true
    }

    /// Limit fragment placed right after the SELECT keyword (`TOP n` family).
    fn write_limit_before_columns(&self, out: &mut String, limits: &LimitPlan) {
        let _ = (out, limits);
    }

    /// Sampling fragment placed after the FROM clause (`TABLESAMPLE` family).
    fn write_table_sample(&self, out: &mut String, limits: &LimitPlan) {
        let _ = (out, limits);
    }

    /// Limit fragment placed after ORDER BY. The ANSI-ish default covers
    /// PostgreSQL, MySQL and SQLite.
    fn write_limit_after_order_by(&self, out: &mut String, limits: &LimitPlan) {
        if limits.option.is_sampling() {
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
        UpsertStyle::Unsupported
    }

    fn returning_style(&self) -> ReturningStyle {
        ReturningStyle::Unsupported
    }

    fn identity_insert_style(&self) -> IdentityInsertStyle {
        IdentityInsertStyle::Include
    }

    fn procedure_style(&self) -> ProcedureStyle {
        ProcedureStyle::Unsupported
    }

    /// Translate a backend native column type name into the crate's value
    /// kind. `None` means the type has no safe host equivalent; the column
    /// degrades to row/dynamic access instead of failing the whole table.
    fn map_native_type(&self, native: &str) -> Option<ValueKind>;
}

/// ANSI-flavored dialect with no backend specifics. Useful for tests and as
/// the reference rendering.
pub struct GenericDialect;

impl Dialect for GenericDialect {
    fn name(&self) -> &'static str {
        "Generic"
    }

    fn map_native_type(&self, native: &str) -> Option<ValueKind> {
        Some(match native.to_ascii_lowercase().as_str() {
            "boolean" | "bool" => ValueKind::Boolean,
            "smallint" => ValueKind::Int16,
            "integer" | "int" => ValueKind::Int32,
            "bigint" => ValueKind::Int64,
            "real" => ValueKind::Float32,
            "double precision" | "float" => ValueKind::Float64,
            "decimal" | "numeric" => ValueKind::Decimal,
            "varchar" | "text" | "char" => ValueKind::Varchar,
            "blob" | "binary" => ValueKind::Blob,
            "date" => ValueKind::Date,
            "time" => ValueKind::Time,
            "timestamp" => ValueKind::Timestamp,
            "timestamp with time zone" => ValueKind::TimestampWithTimezone,
            "uuid" => ValueKind::Uuid,
            _ => return None,
        })
    }
}

pub static GENERIC: GenericDialect = GenericDialect;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_quoting_escapes_embedded_quotes() {
        assert_eq!(GENERIC.quote_identifier(r#"we"ird"#), r#""we""ird""#);
    }

    #[test]
    fn string_literals_double_single_quotes() {
        let mut out = String::new();
        GENERIC.write_value(&mut out, &Value::Varchar(Some("O'Brien".into())));
        assert_eq!(out, "'O''Brien'");
    }

    #[test]
    fn unknown_native_type_degrades_to_none() {
        assert_eq!(GENERIC.map_native_type("hierarchyid"), None);
        assert_eq!(GENERIC.map_native_type("BIGINT"), Some(ValueKind::Int64));
    }
}
