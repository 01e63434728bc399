use crate::error::TableIoError;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Write,
}

impl FromStr for Operation {
    type Err = TableIoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "read" => Ok(Operation::Read),
            "write" => Ok(Operation::Write),
            _ => Err(TableIoError::InvalidOperation(s.to_string())),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Read => write!(f, "read"),
            Operation::Write => write!(f, "write"),
        }
    }
}

/// What to do with rows already present in the target table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritePolicy {
    #[default]
    Replace,
    Append,
    FailIfExists,
}

impl FromStr for WritePolicy {
    type Err = TableIoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "replace" => Ok(WritePolicy::Replace),
            "append" => Ok(WritePolicy::Append),
            "fail" => Ok(WritePolicy::FailIfExists),
            _ => Err(TableIoError::InvalidPolicy(s.to_string())),
        }
    }
}

impl fmt::Display for WritePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WritePolicy::Replace => write!(f, "replace"),
            WritePolicy::Append => write!(f, "append"),
            WritePolicy::FailIfExists => write!(f, "fail"),
        }
    }
}

/// BigQuery's native write disposition for load and query jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteDisposition {
    WriteTruncate,
    WriteAppend,
    WriteEmpty,
}

impl WriteDisposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteDisposition::WriteTruncate => "WRITE_TRUNCATE",
            WriteDisposition::WriteAppend => "WRITE_APPEND",
            WriteDisposition::WriteEmpty => "WRITE_EMPTY",
        }
    }
}

impl From<WritePolicy> for WriteDisposition {
    fn from(policy: WritePolicy) -> Self {
        match policy {
            WritePolicy::Replace => WriteDisposition::WriteTruncate,
            WritePolicy::Append => WriteDisposition::WriteAppend,
            WritePolicy::FailIfExists => WriteDisposition::WriteEmpty,
        }
    }
}

impl fmt::Display for WriteDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_is_case_insensitive() {
        assert_eq!("READ".parse::<Operation>().unwrap(), Operation::Read);
        assert_eq!("read".parse::<Operation>().unwrap(), Operation::Read);
        assert_eq!("Write".parse::<Operation>().unwrap(), Operation::Write);
    }

    #[test]
    fn test_unknown_operation() {
        let err = "delete".parse::<Operation>().unwrap_err();
        assert!(matches!(err, TableIoError::InvalidOperation(ref op) if op == "delete"));
    }

    #[test]
    fn test_policy_is_case_insensitive() {
        assert_eq!("REPLACE".parse::<WritePolicy>().unwrap(), WritePolicy::Replace);
        assert_eq!("Append".parse::<WritePolicy>().unwrap(), WritePolicy::Append);
        assert_eq!("fail".parse::<WritePolicy>().unwrap(), WritePolicy::FailIfExists);
    }

    #[test]
    fn test_unknown_policy() {
        assert!(matches!(
            "merge".parse::<WritePolicy>(),
            Err(TableIoError::InvalidPolicy(_))
        ));
        assert!("fail_if_exists".parse::<WritePolicy>().is_err());
    }

    #[test]
    fn test_default_policy_is_replace() {
        assert_eq!(WritePolicy::default(), WritePolicy::Replace);
    }

    #[test]
    fn test_policy_to_disposition() {
        assert_eq!(
            WriteDisposition::from(WritePolicy::Replace).as_str(),
            "WRITE_TRUNCATE"
        );
        assert_eq!(
            WriteDisposition::from(WritePolicy::Append).as_str(),
            "WRITE_APPEND"
        );
        assert_eq!(
            WriteDisposition::from(WritePolicy::FailIfExists).as_str(),
            "WRITE_EMPTY"
        );
    }

    #[test]
    fn test_policy_display_round_trips_through_parse() {
        for policy in [
            WritePolicy::Replace,
            WritePolicy::Append,
            WritePolicy::FailIfExists,
        ] {
            assert_eq!(policy.to_string().parse::<WritePolicy>().unwrap(), policy);
        }
    }
}
