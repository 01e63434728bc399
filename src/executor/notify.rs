use crate::error::ErrorKind;
use crate::table::TableAddress;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{error, info};

/// Human-facing report of how an operation ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Written { address: TableAddress, rows: usize },
    Failed { kind: ErrorKind, message: String },
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notification::Written { address, .. } => {
                write!(f, "DataFrame saved to {}", address)
            }
            Notification::Failed { message, .. } => write!(f, "An error occurred: {}", message),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification);
}

/// Emits notifications through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) {
        match notification {
            Notification::Written { address, rows } => {
                info!(table = %address, rows = *rows, "{}", notification);
            }
            Notification::Failed { kind, .. } => {
                error!(kind = %kind, "{}", notification);
            }
        }
    }
}

/// Keeps every notification in memory, for callers that want to inspect them.
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    seen: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.seen
            .lock()
            .map(|seen| seen.clone())
            .unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: &Notification) {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(notification.clone());
        }
    }
}
