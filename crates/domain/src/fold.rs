//! Rebuilding aggregate state by folding a stream's events.

use async_trait::async_trait;
use event_store::{
    CancellationToken, EventStore, StreamEvent, StreamName, StreamReadPosition, Version,
};
use futures_util::TryStreamExt;

use crate::aggregate::{Aggregate, DomainEvent};
use crate::error::DomainError;

/// Decodes a stored event into the aggregate's event type.
///
/// Fails with [`DomainError::UnknownEventVariant`] when either the
/// `event_type` column or the payload's `"type"` tag is not one of
/// `E::EVENT_TYPES`. Any other decoding failure is a serialization error.
pub fn decode_event<E: DomainEvent>(
    stream: &StreamName,
    stored: &StreamEvent,
) -> Result<E, DomainError> {
    let unknown = |event_type: &str| DomainError::UnknownEventVariant {
        stream: stream.clone(),
        event_type: event_type.to_string(),
        position: stored.stream_position().unwrap_or_default(),
    };

    if !E::is_known(&stored.event_type) {
        return Err(unknown(&stored.event_type));
    }

    stored
        .payload_as()
        .map_err(|err| match stored.payload.get("type").and_then(|tag| tag.as_str()) {
            Some(tag) if !E::is_known(tag) => unknown(tag),
            _ => DomainError::Serialization(err),
        })
}

/// Folds stored streams into aggregates.
#[async_trait]
pub trait AggregateStreamExt: EventStore {
    /// Reads `stream` from `from` and folds every event into `seed`.
    ///
    /// Events are applied one at a time in stream order. When at least one
    /// event was applied, the aggregate's original and current versions are
    /// set to the position of the last one.
    async fn aggregate_stream<A, F>(
        &self,
        stream: &StreamName,
        from: StreamReadPosition,
        seed: A,
        mut fold: F,
        cancel: &CancellationToken,
    ) -> Result<A, DomainError>
    where
        A: Aggregate,
        F: FnMut(&mut A, &A::Event) + Send,
    {
        let mut events = self.get_stream_events(stream, from, cancel).await?;
        let mut state = seed;
        let mut last: Option<Version> = None;
        let mut replayed = 0_u64;

        while let Some(stored) = events.try_next().await? {
            let position = stored
                .stream_position()
                .unwrap_or_else(|| last.map_or(from.position(), |v| v.next()));
            let event = decode_event::<A::Event>(stream, &stored)?;

            fold(&mut state, &event);
            last = Some(position);
            replayed += 1;
        }

        if let Some(version) = last {
            state.sourcing_mut().mark_loaded(version);
        }

        metrics::histogram!("aggregate_store_events_replayed").record(replayed as f64);
        tracing::debug!(%stream, replayed, "folded stream");

        Ok(state)
    }
}

impl<T: EventStore + ?Sized> AggregateStreamExt for T {}
