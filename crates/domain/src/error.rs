//! Domain error types.

use event_store::{EventStoreError, StreamName, Version};
use thiserror::Error;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the event store.
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    /// A stored event carries a discriminator the aggregate does not know.
    ///
    /// Folding stops here; skipping the event would produce a wrong state.
    #[error("Unknown event type {event_type:?} at position {position} of stream {stream}")]
    UnknownEventVariant {
        stream: StreamName,
        event_type: String,
        position: Version,
    },

    /// Aggregate not found.
    #[error("Aggregate not found: {aggregate_type} with id {aggregate_id}")]
    AggregateNotFound {
        aggregate_type: &'static str,
        aggregate_id: String,
    },

    /// The aggregate has no identifier yet, so it has no stream to store to.
    #[error("Aggregate {aggregate_type} has no id; apply its creating event first")]
    MissingAggregateId { aggregate_type: &'static str },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    /// Returns true if the store rejected an append because the stream moved on.
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, DomainError::EventStore(err) if err.is_concurrency_conflict())
    }
}
