use thiserror::Error;

use crate::{ExpectedStreamVersion, StreamName, Version};

/// Errors that can occur when interacting with the event store.
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// The stream's actual version did not satisfy the expected version.
    ///
    /// Recoverable by reloading the aggregate and re-applying the intent;
    /// the store never retries this itself.
    #[error("Concurrency conflict on stream {stream}: expected {expected}, found {actual}")]
    ConcurrencyConflict {
        stream: StreamName,
        expected: ExpectedStreamVersion,
        actual: Version,
    },

    /// The expected version asserted that the stream exists, but it does not.
    #[error("Stream not found: {0}")]
    StreamNotFound(StreamName),

    /// The batch handed to an append was rejected before touching storage.
    #[error("Invalid append: {0}")]
    InvalidAppend(String),

    /// A stream name could not be built or parsed.
    #[error("Invalid stream name: {0}")]
    InvalidStreamName(String),

    /// The caller cancelled the operation before it reached storage.
    #[error("Operation cancelled")]
    Cancelled,

    /// The store is missing required configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EventStoreError {
    /// Returns true for failures worth retrying at the transport boundary.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EventStoreError::Database(sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut)
        )
    }

    /// Returns true if this is an optimistic concurrency conflict.
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, EventStoreError::ConcurrencyConflict { .. })
    }
}

/// Result type for event store operations.
pub type Result<T> = std::result::Result<T, EventStoreError>;
