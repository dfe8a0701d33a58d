use crate::{ChainError, Result};
use rust_decimal::Decimal;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use uuid::Uuid;

/// A dialect-neutral SQL value.
///
/// Every variant carries an `Option` so a typed NULL (a NULL whose column type
/// is known) keeps its type information; `Value::Null` is an untyped NULL.
#[derive(Default, Debug, Clone, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Boolean(Option<bool>),
    Int16(Option<i16>),
    Int32(Option<i32>),
    Int64(Option<i64>),
    Float32(Option<f32>),
    Float64(Option<f64>),
    Decimal(Option<Decimal>, /* prec: */ u8, /* scale: */ u8),
    Varchar(Option<String>),
    Blob(Option<Box<[u8]>>),
    Date(Option<Date>),
    Time(Option<Time>),
    Timestamp(Option<PrimitiveDateTime>),
    TimestampWithTimezone(Option<OffsetDateTime>),
    Uuid(Option<Uuid>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Boolean(v) => v.is_none(),
            Value::Int16(v) => v.is_none(),
            Value::Int32(v) => v.is_none(),
            Value::Int64(v) => v.is_none(),
            Value::Float32(v) => v.is_none(),
            Value::Float64(v) => v.is_none(),
            Value::Decimal(v, ..) => v.is_none(),
            Value::Varchar(v) => v.is_none(),
            Value::Blob(v) => v.is_none(),
            Value::Date(v) => v.is_none(),
            Value::Time(v) => v.is_none(),
            Value::Timestamp(v) => v.is_none(),
            Value::TimestampWithTimezone(v) => v.is_none(),
            Value::Uuid(v) => v.is_none(),
        }
    }

    pub fn kind(&self) -> Option<ValueKind> {
        Some(match self {
            Value::Null => return None,
            Value::Boolean(..) => ValueKind::Boolean,
            Value::Int16(..) => ValueKind::Int16,
            Value::Int32(..) => ValueKind::Int32,
            Value::Int64(..) => ValueKind::Int64,
            Value::Float32(..) => ValueKind::Float32,
            Value::Float64(..) => ValueKind::Float64,
            Value::Decimal(..) => ValueKind::Decimal,
            Value::Varchar(..) => ValueKind::Varchar,
            Value::Blob(..) => ValueKind::Blob,
            Value::Date(..) => ValueKind::Date,
            Value::Time(..) => ValueKind::Time,
            Value::Timestamp(..) => ValueKind::Timestamp,
            Value::TimestampWithTimezone(..) => ValueKind::TimestampWithTimezone,
            Value::Uuid(..) => ValueKind::Uuid,
        })
    }
}

/// The type of a [`Value`] without its payload. Metadata caches map native
/// column type names to this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Boolean,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Decimal,
    Varchar,
    Blob,
    Date,
    Time,
    Timestamp,
    TimestampWithTimezone,
    Uuid,
}

impl ValueKind {
    /// A typed NULL of this kind.
    pub fn null_value(self) -> Value {
        match self {
            ValueKind::Boolean => Value::Boolean(None),
            ValueKind::Int16 => Value::Int16(None),
            ValueKind::Int32 => Value::Int32(None),
            ValueKind::Int64 => Value::Int64(None),
            ValueKind::Float32 => Value::Float32(None),
            ValueKind::Float64 => Value::Float64(None),
            ValueKind::Decimal => Value::Decimal(None, 0, 0),
            ValueKind::Varchar => Value::Varchar(None),
            ValueKind::Blob => Value::Blob(None),
            ValueKind::Date => Value::Date(None),
            ValueKind::Time => Value::Time(None),
            ValueKind::Timestamp => Value::Timestamp(None),
            ValueKind::TimestampWithTimezone => Value::TimestampWithTimezone(None),
            ValueKind::Uuid => Value::Uuid(None),
        }
    }
}

/// Conversion of host values into [`Value`] when capturing arguments.
pub trait IntoValue {
    fn into_value(self) -> Value;
}

macro_rules! into_value {
    ($type:ty, $variant:ident) => {
        impl IntoValue for $type {
            fn into_value(self) -> Value {
                Value::$variant(Some(self.into()))
            }
        }
    };
}

into_value!(bool, Boolean);
into_value!(i16, Int16);
into_value!(i32, Int32);
into_value!(i64, Int64);
into_value!(f32, Float32);
into_value!(f64, Float64);
into_value!(String, Varchar);
into_value!(&str, Varchar);
into_value!(Date, Date);
into_value!(Time, Time);
into_value!(PrimitiveDateTime, Timestamp);
into_value!(OffsetDateTime, TimestampWithTimezone);
into_value!(Uuid, Uuid);

impl IntoValue for Decimal {
    fn into_value(self) -> Value {
        Value::Decimal(Some(self), 0, self.scale() as u8)
    }
}

impl IntoValue for Vec<u8> {
    fn into_value(self) -> Value {
        Value::Blob(Some(self.into_boxed_slice()))
    }
}

impl IntoValue for &[u8] {
    fn into_value(self) -> Value {
        Value::Blob(Some(self.into()))
    }
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        match self {
            Some(v) => v.into_value(),
            None => Value::Null,
        }
    }
}

/// Conversion of a [`Value`] back into a host value during materialization.
///
/// Integer conversions widen (an `Int16` column reads fine into an `i64`),
/// nothing narrows. A NULL into a non-`Option` target is a mapping error.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self>;
}

fn mismatch<T>(value: &Value, expected: &str) -> Result<T> {
    Err(ChainError::mapping(format!(
        "cannot read {:?} as {}",
        value, expected
    )))
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Boolean(Some(v)) => Ok(*v),
            v => mismatch(v, "bool"),
        }
    }
}

impl FromValue for i16 {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Int16(Some(v)) => Ok(*v),
            v => mismatch(v, "i16"),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Int16(Some(v)) => Ok(*v as i32),
            Value::Int32(Some(v)) => Ok(*v),
            v => mismatch(v, "i32"),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Int16(Some(v)) => Ok(*v as i64),
            Value::Int32(Some(v)) => Ok(*v as i64),
            Value::Int64(Some(v)) => Ok(*v),
            v => mismatch(v, "i64"),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Float32(Some(v)) => Ok(*v),
            v => mismatch(v, "f32"),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Float32(Some(v)) => Ok(*v as f64),
            Value::Float64(Some(v)) => Ok(*v),
            v => mismatch(v, "f64"),
        }
    }
}

impl FromValue for Decimal {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Decimal(Some(v), ..) => Ok(*v),
            v => mismatch(v, "Decimal"),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Varchar(Some(v)) => Ok(v.clone()),
            v => mismatch(v, "String"),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Blob(Some(v)) => Ok(v.to_vec()),
            v => mismatch(v, "Vec<u8>"),
        }
    }
}

impl FromValue for Date {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Date(Some(v)) => Ok(*v),
            v => mismatch(v, "Date"),
        }
    }
}

impl FromValue for Time {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Time(Some(v)) => Ok(*v),
            v => mismatch(v, "Time"),
        }
    }
}

impl FromValue for PrimitiveDateTime {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Timestamp(Some(v)) => Ok(*v),
            v => mismatch(v, "PrimitiveDateTime"),
        }
    }
}

impl FromValue for OffsetDateTime {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::TimestampWithTimezone(Some(v)) => Ok(*v),
            v => mismatch(v, "OffsetDateTime"),
        }
    }
}

impl FromValue for Uuid {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Uuid(Some(v)) => Ok(*v),
            v => mismatch(v, "Uuid"),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_null_keeps_its_kind() {
        let v = ValueKind::Int32.null_value();
        assert!(v.is_null());
        assert_eq!(v.kind(), Some(ValueKind::Int32));
        assert_eq!(Value::Null.kind(), None);
    }

    #[test]
    fn integers_widen_but_never_narrow() {
        assert_eq!(i64::from_value(&Value::Int16(Some(7))).unwrap(), 7);
        assert_eq!(i32::from_value(&Value::Int16(Some(-3))).unwrap(), -3);
        assert!(i16::from_value(&Value::Int64(Some(1))).is_err());
    }

    #[test]
    fn null_into_option_is_none_into_plain_is_error() {
        assert_eq!(
            Option::<String>::from_value(&Value::Varchar(None)).unwrap(),
            None
        );
        assert!(String::from_value(&Value::Varchar(None)).is_err());
    }
}
