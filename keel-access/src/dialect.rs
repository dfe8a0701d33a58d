use keel_core::{Dialect, LimitPlan, ValueKind};
use std::fmt::Write;

/// Jet/ACE SQL surface, the most constrained of the set: bracket quoting,
/// positional `?` parameters, TOP with no offset, and none of the returning,
/// upsert or procedure channels. The driver's catalog comes from the OLE DB
/// schema rowset API rather than SQL, so there is no catalog query here; the
/// metadata source wraps that API instead.
pub struct AccessDialect;

pub static ACCESS: AccessDialect = AccessDialect;

impl Dialect for AccessDialect {
    fn name(&self) -> &'static str {
        "Access"
    }

    fn write_identifier(&self, out: &mut String, value: &str) {
        out.push('[');
        self.write_escaped(out, value, ']', "]]");
        out.push(']');
    }

    fn positional_parameters(&self) -> bool {
        true
    }

    fn write_parameter(&self, out: &mut String, _name: &str, _ordinal: usize) {
        out.push('?');
    }

    fn write_value_bool(&self, out: &mut String, value: bool) {
        out.push_str(["No", "Yes"][value as usize]);
    }

    fn supports_offset(&self) -> bool {
        false
    }

    fn write_limit_before_columns(&self, out: &mut String, limits: &LimitPlan) {
        if let Some(take) = limits.take {
            let _ = write!(out, "TOP {} ", take);
        }
    }

    fn write_limit_after_order_by(&self, _out: &mut String, _limits: &LimitPlan) {}

    fn map_native_type(&self, native: &str) -> Option<ValueKind> {
        let base = native
            .split('(')
            .next()
            .unwrap_or(native)
            .trim()
            .to_ascii_lowercase();
        match base.as_str() {
            "yesno" | "bit" => Some(ValueKind::Boolean),
            "byte" | "short" | "smallint" => Some(ValueKind::Int16),
            "counter" | "autoincrement" | "long" | "integer" | "int" => Some(ValueKind::Int32),
            "single" => Some(ValueKind::Float32),
            "double" => Some(ValueKind::Float64),
            "currency" | "decimal" | "numeric" => Some(ValueKind::Decimal),
            "char" | "text" | "varchar" | "memo" | "longtext" => Some(ValueKind::Varchar),
            "binary" | "varbinary" | "longbinary" | "oleobject" => Some(ValueKind::Blob),
            "datetime" | "date" => Some(ValueKind::Timestamp),
            "guid" | "uniqueidentifier" => Some(ValueKind::Uuid),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_core::LimitOption;

    #[test]
    fn parameters_are_positional_markers() {
        let mut out = String::new();
        ACCESS.write_parameter(&mut out, "FirstName", 0);
        ACCESS.write_parameter(&mut out, "LastName", 1);
        assert_eq!(out, "??");
        assert!(ACCESS.positional_parameters());
    }

    #[test]
    fn top_is_the_only_limit_form() {
        let limits = LimitPlan {
            take: Some(5),
            skip: None,
            option: LimitOption::Rows,
            seed: None,
            has_sort: false,
        };
        let mut out = String::new();
        ACCESS.write_limit_before_columns(&mut out, &limits);
        assert_eq!(out, "TOP 5 ");
        ACCESS.write_limit_after_order_by(&mut out, &limits);
        assert_eq!(out, "TOP 5 ");
        assert!(!ACCESS.supports_offset());
    }

    #[test]
    fn counter_maps_to_int32() {
        assert_eq!(ACCESS.map_native_type("COUNTER"), Some(ValueKind::Int32));
        assert_eq!(ACCESS.map_native_type("OLEOBJECT"), Some(ValueKind::Blob));
        assert_eq!(ACCESS.map_native_type("attachment"), None);
    }
}
