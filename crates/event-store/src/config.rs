//! Event store configuration loaded from environment variables.

use std::time::Duration;

use crate::RetryPolicy;

/// Storage configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `DATABASE_URL`: PostgreSQL connection string (no default)
/// - `EVENT_STORE_MAX_CONNECTIONS`: pool size (default: `5`)
/// - `EVENT_STORE_READ_BATCH_SIZE`: rows fetched per page when reading a stream (default: `500`)
/// - `EVENT_STORE_RETRY_ATTEMPTS`: attempts for transient failures (default: `3`)
/// - `EVENT_STORE_RETRY_BACKOFF_MS`: initial retry delay in milliseconds (default: `50`)
#[derive(Debug, Clone)]
pub struct EventStoreConfig {
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub read_batch_size: i64,
    pub retry_attempts: u32,
    pub retry_backoff: Duration,
}

impl EventStoreConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());

        Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            max_connections: parsed("EVENT_STORE_MAX_CONNECTIONS")
                .and_then(|v| u32::try_from(v).ok())
                .filter(|v| *v > 0)
                .unwrap_or(defaults.max_connections),
            read_batch_size: parsed("EVENT_STORE_READ_BATCH_SIZE")
                .and_then(|v| i64::try_from(v).ok())
                .filter(|v| *v > 0)
                .unwrap_or(defaults.read_batch_size),
            retry_attempts: parsed("EVENT_STORE_RETRY_ATTEMPTS")
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(defaults.retry_attempts),
            retry_backoff: parsed("EVENT_STORE_RETRY_BACKOFF_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_backoff),
        }
    }

    /// Returns the retry policy described by this configuration.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_attempts, self.retry_backoff)
    }
}

impl Default for EventStoreConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: 5,
            read_batch_size: 500,
            retry_attempts: 3,
            retry_backoff: Duration::from_millis(50),
        }
    }
}
