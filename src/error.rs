use gcp_bigquery_client::error::BQError;
use std::fmt;
use thiserror::Error;

/// Coarse classification reported alongside every failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected locally before any warehouse request was made.
    InvalidArgument,
    /// Anything surfaced by the warehouse or while materializing its results.
    RemoteFailure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::InvalidArgument => write!(f, "invalid argument"),
            ErrorKind::RemoteFailure => write!(f, "remote failure"),
        }
    }
}

#[derive(Error, Debug)]
pub enum TableIoError {
    #[error("Invalid operation: {0}. Must be 'read' or 'write'")]
    InvalidOperation(String),

    #[error("Invalid write policy: {0}. Must be 'replace', 'append' or 'fail'")]
    InvalidPolicy(String),

    #[error("A payload dataframe is required for the write operation")]
    MissingPayload,

    #[error("Invalid table address: {0}")]
    InvalidAddress(String),

    #[error("Invalid dataframe: {0}")]
    InvalidFrame(String),

    #[error("BigQuery error: {0}")]
    BigQuery(#[from] BQError),

    #[error("Job {job_id} failed: {message}")]
    JobFailed { job_id: String, message: String },

    #[error("Warehouse error: {0}")]
    Warehouse(String),

    #[error("Conversion error: {0}")]
    Conversion(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TableIoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TableIoError::InvalidOperation(_)
            | TableIoError::InvalidPolicy(_)
            | TableIoError::MissingPayload
            | TableIoError::InvalidAddress(_)
            | TableIoError::InvalidFrame(_)
            | TableIoError::Io(_)
            | TableIoError::Json(_) => ErrorKind::InvalidArgument,
            TableIoError::BigQuery(_)
            | TableIoError::JobFailed { .. }
            | TableIoError::Warehouse(_)
            | TableIoError::Conversion(_) => ErrorKind::RemoteFailure,
        }
    }
}

pub type Result<T> = std::result::Result<T, TableIoError>;
