use crate::error::{Result, TableIoError};
use crate::frame::{Column, Dataframe, Value};
use crate::schema::BqType;
use crate::table::{escape_identifier, TableAddress};

pub(crate) fn build_select_all_sql(address: &TableAddress) -> String {
    format!("SELECT * FROM {}", address.quoted())
}

/// Renders the payload as one or more `SELECT` statements over an inline typed
/// array, each no longer than `max_bytes` unless a single row already exceeds it.
///
/// Always returns at least one statement so that an empty payload still reaches
/// the warehouse with the table's schema.
pub(crate) fn build_load_statements(payload: &Dataframe, max_bytes: usize) -> Result<Vec<String>> {
    if payload.num_columns() == 0 {
        return Err(TableIoError::InvalidFrame(
            "cannot write a dataframe without columns".to_string(),
        ));
    }

    let prefix = format!(
        "SELECT * FROM UNNEST(ARRAY<STRUCT<{}>>[",
        struct_fields(payload.columns())
    );
    let suffix = "])";
    let overhead = prefix.len() + suffix.len();

    let mut statements = Vec::new();
    let mut body = String::new();

    for row in payload.rows() {
        let literal = format!(
            "STRUCT({})",
            payload
                .columns()
                .iter()
                .zip(row.values())
                .map(|(column, value)| sql_literal(value, column.dtype()))
                .collect::<Vec<_>>()
                .join(", ")
        );

        let separator = if body.is_empty() { 0 } else { 2 };
        if !body.is_empty() && overhead + body.len() + separator + literal.len() > max_bytes {
            statements.push(format!("{}{}{}", prefix, body, suffix));
            body.clear();
        }
        if !body.is_empty() {
            body.push_str(", ");
        }
        body.push_str(&literal);
    }

    if !body.is_empty() || statements.is_empty() {
        statements.push(format!("{}{}{}", prefix, body, suffix));
    }

    Ok(statements)
}

fn struct_fields(columns: &[Column]) -> String {
    columns
        .iter()
        .map(|c| format!("`{}` {}", escape_identifier(c.name()), column_sql_type(c.dtype())))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Nested records come back as JSON text and are written back as STRING.
fn column_sql_type(dtype: BqType) -> &'static str {
    match dtype {
        BqType::Struct => "STRING",
        other => other.as_str(),
    }
}

pub(crate) fn sql_literal(value: &Value, dtype: BqType) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Int64(v) => v.to_string(),
        Value::Float64(v) if v.is_nan() => "CAST('NaN' AS FLOAT64)".to_string(),
        Value::Float64(v) if v.is_infinite() && *v > 0.0 => "CAST('inf' AS FLOAT64)".to_string(),
        Value::Float64(v) if v.is_infinite() => "CAST('-inf' AS FLOAT64)".to_string(),
        Value::Float64(v) => format!("{:?}", v),
        Value::Date(d) => format!("DATE '{}'", d.format("%Y-%m-%d")),
        Value::Timestamp(ts) => format!("TIMESTAMP '{}'", ts.format("%Y-%m-%d %H:%M:%S%.6f+00")),
        Value::String(s) => {
            let quoted = quote_string(s);
            match dtype {
                BqType::Bytes => format!("FROM_BASE64({})", quoted),
                BqType::Json => format!("PARSE_JSON({})", quoted),
                BqType::Geography => format!("ST_GEOGFROMTEXT({})", quoted),
                t if t.is_text_encoded() => format!("CAST({} AS {})", quoted, t),
                _ => quoted,
            }
        }
    }
}

/// GoogleSQL single-quoted string literal.
pub(crate) fn quote_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}
