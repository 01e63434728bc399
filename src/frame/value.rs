use crate::schema::BqType;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use std::fmt;

/// A single cell of a [`Dataframe`](super::Dataframe).
///
/// Warehouse types without a dedicated variant (NUMERIC, DATETIME, BYTES, JSON, ...)
/// travel as `String`; the owning column's [`BqType`] says how to interpret them.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int64(i64),
    Float64(f64),
    String(String),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Whether this value may live in a column of `dtype`. Null fits everywhere.
    pub fn fits(&self, dtype: BqType) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(_) => dtype == BqType::Bool,
            Value::Int64(_) => dtype == BqType::Int64,
            Value::Float64(_) => dtype == BqType::Float64,
            Value::Date(_) => dtype == BqType::Date,
            Value::Timestamp(_) => dtype == BqType::Timestamp,
            Value::String(_) => {
                dtype == BqType::String || dtype == BqType::Struct || dtype.is_text_encoded()
            }
        }
    }

    /// Decodes the textual form BigQuery uses for a cell of `dtype`.
    pub fn parse(text: &str, dtype: BqType) -> Result<Value, String> {
        match dtype {
            BqType::Bool => match text.to_ascii_lowercase().as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(format!("'{}' is not a BOOL", text)),
            },
            BqType::Int64 => text
                .parse::<i64>()
                .map(Value::Int64)
                .map_err(|e| format!("'{}' is not an INT64: {}", text, e)),
            BqType::Float64 => text
                .parse::<f64>()
                .map(Value::Float64)
                .map_err(|e| format!("'{}' is not a FLOAT64: {}", text, e)),
            BqType::Date => NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .map(Value::Date)
                .map_err(|e| format!("'{}' is not a DATE: {}", text, e)),
            BqType::Timestamp => parse_timestamp(text).map(Value::Timestamp),
            _ => Ok(Value::String(text.to_string())),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(v) => serde_json::Value::Bool(*v),
            Value::Int64(v) => serde_json::Value::from(*v),
            Value::Float64(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Date(d) => serde_json::Value::String(d.format("%Y-%m-%d").to_string()),
            Value::Timestamp(ts) => {
                serde_json::Value::String(ts.to_rfc3339_opts(SecondsFormat::Micros, true))
            }
        }
    }
}

/// BigQuery's REST API renders timestamps as (possibly scientific) epoch seconds;
/// RFC 3339 text is accepted too.
fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(seconds) = text.parse::<f64>() {
        let micros = (seconds * 1_000_000.0).round() as i64;
        return DateTime::from_timestamp_micros(micros)
            .ok_or_else(|| format!("'{}' is out of TIMESTAMP range", text));
    }
    DateTime::parse_from_rfc3339(text)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| format!("'{}' is not a TIMESTAMP: {}", text, e))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "{}", s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S%.f UTC")),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}
