use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value as JsonValue;
use std::fmt;
use crate::core::{Result, StoreError};

#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Integer(_) => "INTEGER",
            Self::Float(_) => "FLOAT",
            Self::Text(_) => "TEXT",
            Self::Boolean(_) => "BOOLEAN",
            Self::Timestamp(_) => "TIMESTAMP",
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Float(f) => {
                if f.is_finite() && f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                    Some(*f as i64)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Render the value the way it is stored in a snapshot document.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Integer(i) => JsonValue::from(*i),
            // NaN and infinities have no JSON form
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Self::Text(s) => JsonValue::String(s.clone()),
            Self::Boolean(b) => JsonValue::Bool(*b),
            Self::Timestamp(ts) => JsonValue::String(ts.to_rfc3339()),
        }
    }

    /// Convert a snapshot value into a typed value for a live column.
    ///
    /// Conversion is lenient across representations a different store
    /// version may have produced (booleans stored as 0/1 or as text, numbers
    /// stored as text, SQL-style timestamps). Scalars always fit a TEXT
    /// column; arrays and objects never convert.
    pub fn from_json(json: &JsonValue, expected: &DataType) -> Result<Value> {
        match (json, expected) {
            (JsonValue::Null, _) => Ok(Value::Null),

            (JsonValue::Bool(b), DataType::Boolean) => Ok(Value::Boolean(*b)),
            (JsonValue::Number(n), DataType::Boolean) => match n.as_i64() {
                Some(0) => Ok(Value::Boolean(false)),
                Some(1) => Ok(Value::Boolean(true)),
                _ => Err(mismatch(json, expected)),
            },
            (JsonValue::String(s), DataType::Boolean) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(Value::Boolean(true)),
                "false" | "0" => Ok(Value::Boolean(false)),
                _ => Err(mismatch(json, expected)),
            },

            (JsonValue::Number(n), DataType::Integer) => n
                .as_i64()
                .or_else(|| n.as_f64().and_then(|f| Value::Float(f).as_i64()))
                .map(Value::Integer)
                .ok_or_else(|| mismatch(json, expected)),
            (JsonValue::Bool(b), DataType::Integer) => Ok(Value::Integer(i64::from(*b))),
            (JsonValue::String(s), DataType::Integer) => s
                .trim()
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| mismatch(json, expected)),

            (JsonValue::Number(n), DataType::Float) => n
                .as_f64()
                .map(Value::Float)
                .ok_or_else(|| mismatch(json, expected)),
            (JsonValue::String(s), DataType::Float) => s
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| mismatch(json, expected)),
            (JsonValue::Bool(b), DataType::Float) => Ok(Value::Float(if *b { 1.0 } else { 0.0 })),

            (JsonValue::String(s), DataType::Text) => Ok(Value::Text(s.clone())),
            (JsonValue::Number(n), DataType::Text) => Ok(Value::Text(n.to_string())),
            (JsonValue::Bool(b), DataType::Text) => Ok(Value::Text(b.to_string())),

            (JsonValue::String(s), DataType::Timestamp) => parse_timestamp(s)
                .map(Value::Timestamp)
                .ok_or_else(|| mismatch(json, expected)),
            (JsonValue::Number(n), DataType::Timestamp) => n
                .as_i64()
                .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
                .map(Value::Timestamp)
                .ok_or_else(|| mismatch(json, expected)),

            _ => Err(mismatch(json, expected)),
        }
    }
}

fn mismatch(json: &JsonValue, expected: &DataType) -> StoreError {
    StoreError::TypeMismatch(format!("Cannot convert {} to {}", json, expected))
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => {
                if a.is_nan() && b.is_nan() {
                    return true;
                }
                (a - b).abs() < f64::EPSILON
            }
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Timestamp(a), Self::Timestamp(b)) => a == b,
            (Self::Integer(i), Self::Float(f)) | (Self::Float(f), Self::Integer(i)) => {
                (*i as f64 - f).abs() < f64::EPSILON
            }
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(fl) => write!(f, "{}", fl),
            Self::Text(s) => write!(f, "'{}'", s),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Timestamp(ts) => write!(f, "'{}'", ts.to_rfc3339()),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(ts: DateTime<Utc>) -> Self {
        Self::Timestamp(ts)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    Integer,
    Float,
    Text,
    Boolean,
    Timestamp,
}

impl DataType {
    pub fn is_compatible(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (Self::Integer, Value::Integer(_)) => true,
            (Self::Float, Value::Float(_)) => true,
            (Self::Float, Value::Integer(_)) => true,
            (Self::Text, Value::Text(_)) => true,
            (Self::Boolean, Value::Boolean(_)) => true,
            (Self::Timestamp, Value::Timestamp(_)) => true,
            _ => false,
        }
    }

    /// Parse a declared SQL type name as reported by a schema catalog.
    ///
    /// Unknown declarations fall back to `Text`, the loosest storage class.
    pub fn from_declared(declared: &str) -> Self {
        let upper = declared.trim().to_ascii_uppercase();
        let base = upper.split(['(', ' ']).next().unwrap_or_default();
        match base {
            "INT" | "INTEGER" | "BIGINT" | "SMALLINT" | "TINYINT" | "SERIAL" | "BIGSERIAL" => {
                Self::Integer
            }
            "FLOAT" | "REAL" | "DOUBLE" | "NUMERIC" | "DECIMAL" => Self::Float,
            "BOOL" | "BOOLEAN" => Self::Boolean,
            "TIMESTAMP" | "TIMESTAMPTZ" | "DATETIME" | "DATE" => Self::Timestamp,
            _ => Self::Text,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "INTEGER"),
            Self::Float => write!(f, "FLOAT"),
            Self::Text => write!(f, "TEXT"),
            Self::Boolean => write!(f, "BOOLEAN"),
            Self::Timestamp => write!(f, "TIMESTAMP"),
        }
    }
}
