use chrono::{DateTime, Utc};
use rusqlite::types::Value as SqlValue;

use super::StorageKind;

/// Runtime value of a single property.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(DateTime<Utc>),
    Binary(Vec<u8>),
    /// Elements of a scalar array property
    Array(Vec<Value>),
}

/// Seconds since the Unix epoch, the stored form of every date.
pub fn date_to_epoch(date: &DateTime<Utc>) -> f64 {
    date.timestamp() as f64 + f64::from(date.timestamp_subsec_nanos()) / 1_000_000_000.0
}

/// Inverse of [`date_to_epoch`]. `None` for non-finite or out-of-range input.
pub fn date_from_epoch(epoch: f64) -> Option<DateTime<Utc>> {
    if !epoch.is_finite() {
        return None;
    }
    let secs = epoch.floor();
    let nanos = ((epoch - secs) * 1_000_000_000.0).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(secs as i64, nanos)
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Form bound to a statement parameter.
    ///
    /// Booleans become 0/1 and dates become epoch offsets. Arrays have no
    /// single-column form and bind as NULL.
    pub fn to_sql(&self) -> SqlValue {
        match self {
            Value::Null | Value::Array(_) => SqlValue::Null,
            Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
            Value::Int(i) => SqlValue::Integer(*i),
            Value::Float(f) => SqlValue::Real(*f),
            Value::Text(s) => SqlValue::Text(s.clone()),
            Value::Date(d) => SqlValue::Real(date_to_epoch(d)),
            Value::Binary(b) => SqlValue::Blob(b.clone()),
        }
    }

    /// Coerces a stored column value into the runtime shape of `kind`.
    ///
    /// `kind` is the scalar element kind; NULL and unconvertible values
    /// yield `None` so the caller leaves the property unset.
    pub fn from_sql(kind: &StorageKind, stored: SqlValue) -> Option<Value> {
        match (kind, stored) {
            (_, SqlValue::Null) => None,
            (StorageKind::Bool, SqlValue::Integer(i)) => Some(Value::Bool(i != 0)),
            (StorageKind::Bool, SqlValue::Real(f)) => Some(Value::Bool(f != 0.0)),
            (StorageKind::Bool, SqlValue::Text(s)) => Some(Value::Bool(s == "1" || s == "true")),
            (StorageKind::Int, SqlValue::Integer(i)) => Some(Value::Int(i)),
            (StorageKind::Int, SqlValue::Real(f)) => Some(Value::Int(f as i64)),
            (StorageKind::Int, SqlValue::Text(s)) => s.trim().parse().ok().map(Value::Int),
            (StorageKind::Float, SqlValue::Real(f)) => Some(Value::Float(f)),
            (StorageKind::Float, SqlValue::Integer(i)) => Some(Value::Float(i as f64)),
            (StorageKind::Float, SqlValue::Text(s)) => s.trim().parse().ok().map(Value::Float),
            (StorageKind::Date, SqlValue::Real(f)) => date_from_epoch(f).map(Value::Date),
            (StorageKind::Date, SqlValue::Integer(i)) => date_from_epoch(i as f64).map(Value::Date),
            (StorageKind::Date, SqlValue::Text(s)) => s
                .trim()
                .parse()
                .ok()
                .and_then(date_from_epoch)
                .map(Value::Date),
            (StorageKind::String, SqlValue::Text(s)) => Some(Value::Text(s)),
            (StorageKind::String, SqlValue::Integer(i)) => Some(Value::Text(i.to_string())),
            (StorageKind::String, SqlValue::Real(f)) => Some(Value::Text(f.to_string())),
            (StorageKind::Binary, SqlValue::Blob(b)) => Some(Value::Binary(b)),
            (StorageKind::Binary, SqlValue::Text(s)) => Some(Value::Binary(s.into_bytes())),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Date(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

macro_rules! array_from {
    ($($ty:ty),*) => {
        $(
            impl From<Vec<$ty>> for Value {
                fn from(values: Vec<$ty>) -> Self {
                    Value::Array(values.into_iter().map(Value::from).collect())
                }
            }
        )*
    };
}

array_from!(bool, i64, f64, String, DateTime<Utc>);

/// Conversion from a [`Value`] back into a property's Rust type.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Option<Self>;
}

impl FromValue for bool {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(b),
            Value::Int(i) => Some(i != 0),
            _ => None,
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Int(i) => Some(i),
            Value::Bool(b) => Some(i64::from(b)),
            _ => None,
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: Value) -> Option<Self> {
        i64::from_value(value).and_then(|i| i32::try_from(i).ok())
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Float(f) => Some(f),
            Value::Int(i) => Some(i as f64),
            _ => None,
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Date(d) => Some(d),
            Value::Float(f) => date_from_epoch(f),
            _ => None,
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Binary(b) => Some(b),
            _ => None,
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

macro_rules! array_from_value {
    ($($ty:ty),*) => {
        $(
            impl FromValue for Vec<$ty> {
                fn from_value(value: Value) -> Option<Self> {
                    match value {
                        Value::Array(items) => items.into_iter().map(<$ty>::from_value).collect(),
                        _ => None,
                    }
                }
            }
        )*
    };
}

array_from_value!(bool, i64, f64, String, DateTime<Utc>);

/// Stores `value` into `slot` when it converts, returning whether it did.
///
/// Intended for `Record::set_value` implementations.
pub fn assign<T: FromValue>(slot: &mut T, value: Value) -> bool {
    match T::from_value(value) {
        Some(v) => {
            *slot = v;
            true
        }
        None => false,
    }
}
