use crate::error::{Result, TableIoError};
use std::fmt;

/// Fully qualified location of a warehouse table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableAddress {
    project: String,
    dataset: String,
    table: String,
}

impl TableAddress {
    pub fn new(
        project: impl Into<String>,
        dataset: impl Into<String>,
        table: impl Into<String>,
    ) -> Result<Self> {
        let project = project.into();
        let dataset = dataset.into();
        let table = table.into();

        validate_part(&project, "project id")?;
        validate_part(&dataset, "dataset id")?;
        validate_part(&table, "table id")?;

        Ok(Self {
            project,
            dataset,
            table,
        })
    }

    /// Parses `project.dataset.table`, optionally wrapped in backticks.
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let unquoted = trimmed
            .strip_prefix('`')
            .and_then(|rest| rest.strip_suffix('`'))
            .unwrap_or(trimmed);

        let parts: Vec<&str> = unquoted.split('.').collect();
        match parts.as_slice() {
            [project, dataset, table] => Self::new(*project, *dataset, *table),
            _ => Err(TableIoError::InvalidAddress(format!(
                "expected project.dataset.table, got '{}'",
                s
            ))),
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn qualified(&self) -> String {
        format!("{}.{}.{}", self.project, self.dataset, self.table)
    }

    /// Backtick-quoted form safe to splice into a GoogleSQL statement.
    pub fn quoted(&self) -> String {
        format!(
            "`{}.{}.{}`",
            escape_identifier(&self.project),
            escape_identifier(&self.dataset),
            escape_identifier(&self.table)
        )
    }

    /// Another table in the same project and dataset.
    pub fn sibling(&self, table: impl Into<String>) -> Result<Self> {
        Self::new(self.project.clone(), self.dataset.clone(), table)
    }
}

impl fmt::Display for TableAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project, self.dataset, self.table)
    }
}

fn validate_part(part: &str, context: &str) -> Result<()> {
    if part.is_empty() {
        return Err(TableIoError::InvalidAddress(format!(
            "{} cannot be empty",
            context
        )));
    }
    if part.chars().any(char::is_control) {
        return Err(TableIoError::InvalidAddress(format!(
            "{} contains control characters",
            context
        )));
    }
    Ok(())
}

pub(crate) fn escape_identifier(identifier: &str) -> String {
    let mut escaped = String::with_capacity(identifier.len());
    for ch in identifier.chars() {
        match ch {
            '`' => escaped.push_str("\\`"),
            '\\' => escaped.push_str("\\\\"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
