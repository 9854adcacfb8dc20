use std::collections::HashSet;
use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;
use futures_util::TryStreamExt;
use tokio_util::sync::CancellationToken;

use crate::{
    AppendResult, EventStoreError, ExpectedStreamVersion, Result, StreamEvent, StreamName,
    StreamReadPosition, Version,
};

/// A stream of events read from a single event stream.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>;

/// Core trait for event store implementations.
///
/// An event store keeps one append-only sequence of events per stream and
/// is the only party that assigns stream positions. All implementations must
/// be thread-safe (Send + Sync) and hold no per-caller state, so a single
/// instance can serve concurrent tasks.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends events to the end of a stream.
    ///
    /// Events are appended atomically at contiguous positions directly after
    /// the stream's current tail. Fails with `ConcurrencyConflict` if the
    /// stream's version does not satisfy `expected`, or with `StreamNotFound`
    /// if `expected` asserts that an absent stream exists. A failed append
    /// leaves the stream unchanged.
    ///
    /// Returns the stream version after the append.
    async fn append_events(
        &self,
        stream: &StreamName,
        events: Vec<StreamEvent>,
        expected: ExpectedStreamVersion,
        cancel: &CancellationToken,
    ) -> Result<AppendResult>;

    /// Reads a stream forward from `from` (inclusive) up to the tail present
    /// when the call was made.
    ///
    /// The returned stream is lazy and finite; calling again re-reads. A
    /// stream that does not exist yields no events.
    async fn get_stream_events(
        &self,
        stream: &StreamName,
        from: StreamReadPosition,
        cancel: &CancellationToken,
    ) -> Result<EventStream>;

    /// Gets the current version of a stream.
    ///
    /// Returns None if nothing has ever been appended to it.
    async fn stream_version(
        &self,
        stream: &StreamName,
        cancel: &CancellationToken,
    ) -> Result<Option<Version>>;
}

/// Extension trait providing convenience methods for event stores.
#[async_trait]
pub trait EventStoreExt: EventStore {
    /// Appends a single event to a stream.
    async fn append_event(
        &self,
        stream: &StreamName,
        event: StreamEvent,
        expected: ExpectedStreamVersion,
        cancel: &CancellationToken,
    ) -> Result<AppendResult> {
        self.append_events(stream, vec![event], expected, cancel)
            .await
    }

    /// Checks if a stream exists (has any events).
    async fn stream_exists(&self, stream: &StreamName, cancel: &CancellationToken) -> Result<bool> {
        Ok(self.stream_version(stream, cancel).await?.is_some())
    }

    /// Reads a stream forward and collects the events.
    async fn read_stream(
        &self,
        stream: &StreamName,
        from: StreamReadPosition,
        cancel: &CancellationToken,
    ) -> Result<Vec<StreamEvent>> {
        self.get_stream_events(stream, from, cancel)
            .await?
            .try_collect()
            .await
    }
}

// Blanket implementation for all EventStore implementations
impl<T: EventStore + ?Sized> EventStoreExt for T {}

/// Validates events before appending.
pub fn validate_events_for_append(events: &[StreamEvent]) -> Result<()> {
    if events.is_empty() {
        return Err(EventStoreError::InvalidAppend(
            "cannot append an empty event list".to_string(),
        ));
    }

    let mut seen = HashSet::with_capacity(events.len());
    for event in events {
        if !seen.insert(event.event_id) {
            return Err(EventStoreError::InvalidAppend(format!(
                "event {} appears more than once in the batch",
                event.event_id
            )));
        }
    }

    Ok(())
}

/// Places a batch directly after `current`, returning the positioned events
/// and the resulting stream version.
pub(crate) fn position_events(
    events: Vec<StreamEvent>,
    current: Version,
) -> (Vec<StreamEvent>, Version) {
    let mut position = current;
    let positioned = events
        .into_iter()
        .map(|event| {
            position = position.next();
            event.at_position(position)
        })
        .collect();
    (positioned, position)
}

/// Records a rejected append in logs and metrics before it is returned.
pub(crate) fn observe_rejection(err: &EventStoreError) {
    if let EventStoreError::ConcurrencyConflict {
        stream,
        expected,
        actual,
    } = err
    {
        metrics::counter!("event_store_concurrency_conflicts_total").increment(1);
        tracing::warn!(%stream, %expected, %actual, "append rejected by version check");
    }
}
