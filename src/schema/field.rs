use std::fmt;
use std::str::FromStr;

/// Column types as BigQuery names them in standard SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BqType {
    String,
    Int64,
    Float64,
    Numeric,
    Bignumeric,
    Bool,
    Bytes,
    Date,
    Datetime,
    Time,
    Timestamp,
    Geography,
    Json,
    Interval,
    Struct,
}

impl BqType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BqType::String => "STRING",
            BqType::Int64 => "INT64",
            BqType::Float64 => "FLOAT64",
            BqType::Numeric => "NUMERIC",
            BqType::Bignumeric => "BIGNUMERIC",
            BqType::Bool => "BOOL",
            BqType::Bytes => "BYTES",
            BqType::Date => "DATE",
            BqType::Datetime => "DATETIME",
            BqType::Time => "TIME",
            BqType::Timestamp => "TIMESTAMP",
            BqType::Geography => "GEOGRAPHY",
            BqType::Json => "JSON",
            BqType::Interval => "INTERVAL",
            BqType::Struct => "STRUCT",
        }
    }

    /// Types whose values are carried as text and need an explicit cast when
    /// written back.
    pub fn is_text_encoded(&self) -> bool {
        matches!(
            self,
            BqType::Numeric
                | BqType::Bignumeric
                | BqType::Bytes
                | BqType::Datetime
                | BqType::Time
                | BqType::Geography
                | BqType::Json
                | BqType::Interval
        )
    }
}

impl fmt::Display for BqType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BqType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "STRING" => Ok(BqType::String),
            "INT64" | "INTEGER" => Ok(BqType::Int64),
            "FLOAT64" | "FLOAT" => Ok(BqType::Float64),
            "NUMERIC" | "DECIMAL" => Ok(BqType::Numeric),
            "BIGNUMERIC" | "BIGDECIMAL" => Ok(BqType::Bignumeric),
            "BOOL" | "BOOLEAN" => Ok(BqType::Bool),
            "BYTES" => Ok(BqType::Bytes),
            "DATE" => Ok(BqType::Date),
            "DATETIME" => Ok(BqType::Datetime),
            "TIME" => Ok(BqType::Time),
            "TIMESTAMP" => Ok(BqType::Timestamp),
            "GEOGRAPHY" => Ok(BqType::Geography),
            "JSON" => Ok(BqType::Json),
            "INTERVAL" => Ok(BqType::Interval),
            "STRUCT" | "RECORD" => Ok(BqType::Struct),
            other => Err(format!("Unknown BigQuery type: {}", other)),
        }
    }
}
