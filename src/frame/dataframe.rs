use super::value::Value;
use crate::error::{Result, TableIoError};
use crate::schema::BqType;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    dtype: BqType,
    values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, dtype: BqType, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            dtype,
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dtype(&self) -> BqType {
        self.dtype
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn non_null_count(&self) -> usize {
        self.values.iter().filter(|v| !v.is_null()).count()
    }

    fn take(&self, indices: &[usize]) -> Column {
        Column {
            name: self.name.clone(),
            dtype: self.dtype,
            values: indices.iter().map(|&i| self.values[i].clone()).collect(),
        }
    }
}

/// Columnar in-memory table. Every column holds the same number of rows.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataframe {
    columns: Vec<Column>,
    num_rows: usize,
}

impl Dataframe {
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let num_rows = columns.first().map(Column::len).unwrap_or(0);

        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(TableIoError::InvalidFrame(format!(
                    "duplicate column '{}'",
                    column.name
                )));
            }
            if column.len() != num_rows {
                return Err(TableIoError::InvalidFrame(format!(
                    "column '{}' has {} rows, expected {}",
                    column.name,
                    column.len(),
                    num_rows
                )));
            }
            if let Some(bad) = column.values.iter().find(|v| !v.fits(column.dtype)) {
                return Err(TableIoError::InvalidFrame(format!(
                    "column '{}' of type {} holds incompatible value {:?}",
                    column.name, column.dtype, bad
                )));
            }
        }

        Ok(Self { columns, num_rows })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows == 0
    }

    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        (index < self.num_rows).then_some(Row { frame: self, index })
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        (0..self.num_rows).map(move |index| Row { frame: self, index })
    }

    pub fn head(&self, n: usize) -> Dataframe {
        let indices: Vec<usize> = (0..self.num_rows.min(n)).collect();
        self.take(&indices)
    }

    pub fn filter<F>(&self, mut predicate: F) -> Dataframe
    where
        F: FnMut(&Row<'_>) -> bool,
    {
        let indices: Vec<usize> = self
            .rows()
            .filter(|row| predicate(row))
            .map(|row| row.index)
            .collect();
        self.take(&indices)
    }

    /// Rows whose `column` renders equal to `value`, ignoring case.
    pub fn filter_eq_ignore_case(&self, column: &str, value: &str) -> Result<Dataframe> {
        if self.column(column).is_none() {
            return Err(TableIoError::InvalidFrame(format!(
                "unknown column '{}'",
                column
            )));
        }
        let wanted = value.to_lowercase();
        Ok(self.filter(|row| {
            row.get(column)
                .filter(|v| !v.is_null())
                .is_some_and(|v| v.to_string().to_lowercase() == wanted)
        }))
    }

    /// Concatenates `other` below `self`. Both frames must share column names and types.
    pub fn append(&self, other: &Dataframe) -> Result<Dataframe> {
        if self.columns.is_empty() {
            return Ok(other.clone());
        }
        if other.columns.is_empty() {
            return Ok(self.clone());
        }
        if !self.same_schema(other) {
            return Err(TableIoError::InvalidFrame(format!(
                "schema mismatch: [{}] vs [{}]",
                self.schema_string(),
                other.schema_string()
            )));
        }

        let columns = self
            .columns
            .iter()
            .zip(&other.columns)
            .map(|(left, right)| {
                let mut values = Vec::with_capacity(left.len() + right.len());
                values.extend_from_slice(&left.values);
                values.extend_from_slice(&right.values);
                Column::new(left.name.clone(), left.dtype, values)
            })
            .collect();

        Ok(Dataframe {
            columns,
            num_rows: self.num_rows + other.num_rows,
        })
    }

    pub fn same_schema(&self, other: &Dataframe) -> bool {
        self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(&other.columns)
                .all(|(a, b)| a.name == b.name && a.dtype == b.dtype)
    }

    pub fn info(&self) -> FrameInfo {
        FrameInfo {
            rows: self.num_rows,
            columns: self
                .columns
                .iter()
                .map(|c| ColumnInfo {
                    name: c.name.clone(),
                    dtype: c.dtype,
                    non_null: c.non_null_count(),
                })
                .collect(),
        }
    }

    fn schema_string(&self) -> String {
        self.columns
            .iter()
            .map(|c| format!("{} {}", c.name, c.dtype))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn take(&self, indices: &[usize]) -> Dataframe {
        Dataframe {
            columns: self.columns.iter().map(|c| c.take(indices)).collect(),
            num_rows: indices.len(),
        }
    }
}

/// Borrowed view of one row.
#[derive(Clone, Copy)]
pub struct Row<'a> {
    frame: &'a Dataframe,
    index: usize,
}

impl<'a> Row<'a> {
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        let frame: &'a Dataframe = self.frame;
        let index = self.index;
        frame.column(column).map(|c| &c.values[index])
    }

    pub fn values(&self) -> impl Iterator<Item = &'a Value> + 'a {
        let frame: &'a Dataframe = self.frame;
        let index = self.index;
        frame.columns.iter().map(move |c| &c.values[index])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    pub dtype: BqType,
    pub non_null: usize,
}

/// Shape and per-column summary of a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameInfo {
    pub rows: usize,
    pub columns: Vec<ColumnInfo>,
}

impl fmt::Display for FrameInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} rows, {} columns", self.rows, self.columns.len())?;
        for (i, column) in self.columns.iter().enumerate() {
            writeln!(
                f,
                "  {:>3}  {:<24} {:>8} non-null  {}",
                i, column.name, column.non_null, column.dtype
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complaints() -> Dataframe {
        Dataframe::new(vec![
            Column::new(
                "id",
                BqType::Int64,
                vec![Value::Int64(1), Value::Int64(2), Value::Int64(3)],
            ),
            Column::new(
                "status",
                BqType::String,
                vec![
                    Value::from("Closed"),
                    Value::from("open"),
                    Value::from("CLOSED"),
                ],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_new_rejects_ragged_columns() {
        let err = Dataframe::new(vec![
            Column::new("a", BqType::Int64, vec![Value::Int64(1)]),
            Column::new("b", BqType::Int64, vec![]),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("column 'b' has 0 rows"));
    }

    #[test]
    fn test_new_rejects_duplicate_names() {
        let result = Dataframe::new(vec![
            Column::new("a", BqType::Int64, vec![]),
            Column::new("a", BqType::String, vec![]),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_new_rejects_mistyped_value() {
        let result = Dataframe::new(vec![Column::new(
            "a",
            BqType::Int64,
            vec![Value::from("one")],
        )]);
        assert!(result.is_err());
    }

    #[test]
    fn test_head() {
        let df = complaints();
        let head = df.head(2);
        assert_eq!(head.num_rows(), 2);
        assert_eq!(head.column_names(), vec!["id", "status"]);
        assert_eq!(df.head(10).num_rows(), 3);
    }

    #[test]
    fn test_filter_eq_ignore_case() {
        let closed = complaints().filter_eq_ignore_case("status", "closed").unwrap();
        assert_eq!(closed.num_rows(), 2);
        let ids: Vec<i64> = closed
            .column("id")
            .unwrap()
            .values()
            .iter()
            .filter_map(Value::as_i64)
            .collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_filter_unknown_column() {
        assert!(complaints().filter_eq_ignore_case("state", "closed").is_err());
    }

    #[test]
    fn test_filter_by_predicate() {
        let df = complaints();
        let big = df.filter(|row| row.get("id").and_then(Value::as_i64).unwrap_or(0) > 1);
        assert_eq!(big.num_rows(), 2);
    }

    #[test]
    fn test_append() {
        let df = complaints();
        let both = df.append(&df).unwrap();
        assert_eq!(both.num_rows(), 6);
        assert_eq!(both.row(3).unwrap().get("id"), Some(&Value::Int64(1)));
    }

    #[test]
    fn test_append_schema_mismatch() {
        let other = Dataframe::new(vec![Column::new("id", BqType::String, vec![])]).unwrap();
        assert!(complaints().append(&other).is_err());
    }

    #[test]
    fn test_append_to_empty_frame() {
        let df = complaints();
        assert_eq!(Dataframe::empty().append(&df).unwrap(), df);
    }

    #[test]
    fn test_info_counts_non_null() {
        let df = Dataframe::new(vec![Column::new(
            "a",
            BqType::Float64,
            vec![Value::Float64(1.0), Value::Null],
        )])
        .unwrap();
        let info = df.info();
        assert_eq!(info.rows, 2);
        assert_eq!(info.columns[0].non_null, 1);
        assert!(info.to_string().starts_with("2 rows, 1 columns"));
    }
}
