//! Parameter and result values.
//!
//! `Value` is the single exchange type between the query engine and a
//! `Connection`: every bound parameter and every result cell is a `Value`.
//! SQL text never contains literal values, only placeholders.

use serde::{Deserialize, Serialize};

/// A database value, either bound as a parameter or read from a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// SQL NULL
    Null,
    /// Boolean
    Bool(bool),
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    BigInt(i64),
    /// 64-bit float
    Double(f64),
    /// Text / VARCHAR
    Text(String),
    /// Raw bytes / BLOB
    Bytes(Vec<u8>),
    /// UUID in canonical hyphenated form
    Uuid(String),
    /// JSON document
    Json(serde_json::Value),
    /// Array of values (drivers may flatten or reject)
    Array(Vec<Value>),
}

/// The all-zero UUID used as the "empty" sentinel by guarded filters.
pub const EMPTY_UUID: &str = "00000000-0000-0000-0000-000000000000";

impl Value {
    /// Whether this value is SQL NULL.
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether this value counts as "empty" for guarded filter variants:
    /// NULL, an empty/whitespace string, or the all-zero UUID sentinel.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(s) => s.trim().is_empty(),
            Value::Uuid(u) => u == EMPTY_UUID,
            _ => false,
        }
    }

    /// Variant name, used in error messages instead of the value itself.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::BigInt(_) => "bigint",
            Value::Double(_) => "double",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Uuid(_) => "uuid",
            Value::Json(_) => "json",
            Value::Array(_) => "array",
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::BigInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Value::Null,
        }
    }
}

/// Conversion out of a scalar `Value`, used by aggregate terminal reads.
///
/// Numeric conversions map NULL to zero so that e.g. `SUM` over an empty
/// row set reads as `0` rather than an error.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, crate::error::Error>;
}

fn conversion_error(value: &Value, target: &'static str) -> crate::error::Error {
    crate::error::Error::InvalidArgument(format!(
        "cannot convert {} value into {target}",
        value.type_name()
    ))
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, crate::error::Error> {
        Ok(value)
    }
}

impl FromValue for i32 {
    fn from_value(value: Value) -> Result<Self, crate::error::Error> {
        match value {
            Value::Null => Ok(0),
            Value::Int(i) => Ok(i),
            Value::BigInt(i) => Ok(i as i32),
            Value::Double(f) => Ok(f as i32),
            other => Err(conversion_error(&other, "i32")),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Result<Self, crate::error::Error> {
        match value {
            Value::Null => Ok(0),
            Value::Int(i) => Ok(i64::from(i)),
            Value::BigInt(i) => Ok(i),
            Value::Double(f) => Ok(f as i64),
            other => Err(conversion_error(&other, "i64")),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, crate::error::Error> {
        match value {
            Value::Null => Ok(0.0),
            Value::Int(i) => Ok(f64::from(i)),
            Value::BigInt(i) => Ok(i as f64),
            Value::Double(f) => Ok(f),
            other => Err(conversion_error(&other, "f64")),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, crate::error::Error> {
        match value {
            Value::Null => Ok(String::new()),
            Value::Text(s) | Value::Uuid(s) => Ok(s),
            other => Err(conversion_error(&other, "String")),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, crate::error::Error> {
        match value {
            Value::Null => Ok(false),
            Value::Bool(b) => Ok(b),
            Value::Int(i) => Ok(i != 0),
            Value::BigInt(i) => Ok(i != 0),
            other => Err(conversion_error(&other, "bool")),
        }
    }
}
