use super::dataframe::{Column, Dataframe};
use super::value::Value;
use crate::error::{Result, TableIoError};
use crate::schema::BqType;
use serde_json::{Map, Value as JsonValue};

#[derive(Default)]
struct Observed {
    bools: bool,
    ints: bool,
    floats: bool,
    other: bool,
}

impl Observed {
    fn record(&mut self, value: &JsonValue) {
        match value {
            JsonValue::Null => {}
            JsonValue::Bool(_) => self.bools = true,
            JsonValue::Number(n) if n.is_i64() => self.ints = true,
            JsonValue::Number(_) => self.floats = true,
            _ => self.other = true,
        }
    }

    fn infer(&self) -> BqType {
        let numeric = self.ints || self.floats;
        if self.other || (self.bools && numeric) {
            BqType::String
        } else if self.floats {
            BqType::Float64
        } else if self.ints {
            BqType::Int64
        } else if self.bools {
            BqType::Bool
        } else {
            BqType::String
        }
    }
}

fn convert(value: Option<&JsonValue>, dtype: BqType) -> Value {
    match (value, dtype) {
        (None | Some(JsonValue::Null), _) => Value::Null,
        (Some(JsonValue::Bool(b)), BqType::Bool) => Value::Bool(*b),
        (Some(JsonValue::Number(n)), BqType::Int64) => {
            n.as_i64().map(Value::Int64).unwrap_or(Value::Null)
        }
        (Some(JsonValue::Number(n)), BqType::Float64) => {
            n.as_f64().map(Value::Float64).unwrap_or(Value::Null)
        }
        (Some(JsonValue::String(s)), _) => Value::String(s.clone()),
        (Some(other), _) => Value::String(other.to_string()),
    }
}

impl Dataframe {
    /// Builds a frame from JSON objects, one per row.
    ///
    /// Columns appear in order of first occurrence; a key missing from a row is NULL.
    pub fn from_json_rows(rows: &[JsonValue]) -> Result<Dataframe> {
        let mut objects: Vec<&Map<String, JsonValue>> = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            let object = row.as_object().ok_or_else(|| {
                TableIoError::InvalidFrame(format!("row {} is not a JSON object", i))
            })?;
            objects.push(object);
        }

        let mut names: Vec<&str> = Vec::new();
        for object in &objects {
            for key in object.keys() {
                if !names.contains(&key.as_str()) {
                    names.push(key);
                }
            }
        }

        let columns = names
            .into_iter()
            .map(|name| {
                let mut observed = Observed::default();
                for object in &objects {
                    if let Some(value) = object.get(name) {
                        observed.record(value);
                    }
                }
                let dtype = observed.infer();
                let values = objects
                    .iter()
                    .map(|object| convert(object.get(name), dtype))
                    .collect();
                Column::new(name, dtype, values)
            })
            .collect();

        Dataframe::new(columns)
    }

    /// Accepts either a JSON array of objects or newline-delimited objects.
    pub fn from_json_str(text: &str) -> Result<Dataframe> {
        let trimmed = text.trim_start();
        if trimmed.starts_with('[') {
            let rows: Vec<JsonValue> = serde_json::from_str(trimmed)?;
            return Dataframe::from_json_rows(&rows);
        }

        let rows = trimmed
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(serde_json::from_str::<JsonValue>)
            .collect::<std::result::Result<Vec<JsonValue>, _>>()?;
        Dataframe::from_json_rows(&rows)
    }

    pub fn to_json_rows(&self) -> Vec<JsonValue> {
        self.rows()
            .map(|row| {
                let object: Map<String, JsonValue> = self
                    .columns()
                    .iter()
                    .zip(row.values())
                    .map(|(column, value)| (column.name().to_string(), value.to_json()))
                    .collect();
                JsonValue::Object(object)
            })
            .collect()
    }
}
