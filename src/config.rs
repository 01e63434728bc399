use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

/// GoogleSQL caps query text at 1024 KB; leave headroom for the job envelope.
const DEFAULT_MAX_STATEMENT_BYTES: usize = 900 * 1024;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Settings for BigQuery sessions.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Service account key; Application Default Credentials are used when absent.
    pub key_file: Option<PathBuf>,
    pub poll_interval: Duration,
    pub max_statement_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            key_file: None,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_statement_bytes: DEFAULT_MAX_STATEMENT_BYTES,
        }
    }
}

impl Config {
    /// Reads `GOOGLE_APPLICATION_CREDENTIALS`, `BQIO_POLL_INTERVAL_MS` and
    /// `BQIO_MAX_STATEMENT_BYTES`, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            key_file: std::env::var_os("GOOGLE_APPLICATION_CREDENTIALS")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            poll_interval: Duration::from_millis(env_or(
                "BQIO_POLL_INTERVAL_MS",
                DEFAULT_POLL_INTERVAL_MS,
            )),
            max_statement_bytes: env_or("BQIO_MAX_STATEMENT_BYTES", DEFAULT_MAX_STATEMENT_BYTES)
                .max(1),
        }
    }

    pub fn with_key_file(mut self, key_file: impl Into<PathBuf>) -> Self {
        self.key_file = Some(key_file.into());
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_max_statement_bytes(mut self, max_statement_bytes: usize) -> Self {
        self.max_statement_bytes = max_statement_bytes.max(1);
        self
    }
}
