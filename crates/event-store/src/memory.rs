use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::{
    AppendResult, EventId, EventStoreError, ExpectedStreamVersion, Result, StreamEvent,
    StreamName, StreamReadPosition, Version,
    store::{
        EventStore, EventStream, observe_rejection, position_events, validate_events_for_append,
    },
};

/// In-memory event store implementation.
///
/// Keeps every stream in a map guarded by a single lock; the write lock makes
/// the version check and the append one atomic step. Provides the same
/// semantics as the PostgreSQL implementation, which makes it the store of
/// choice for tests and local development.
///
/// Event ids are unique across all streams, as in the `stream_events` table.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    streams: HashMap<StreamName, Vec<StreamEvent>>,
    event_ids: HashSet<EventId>,
}

impl InMemoryEventStore {
    /// Creates a new empty in-memory event store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of events stored across all streams.
    pub async fn event_count(&self) -> usize {
        self.inner.read().await.streams.values().map(Vec::len).sum()
    }

    /// Returns the number of streams that hold at least one event.
    pub async fn stream_count(&self) -> usize {
        self.inner.read().await.streams.len()
    }

    /// Clears all streams.
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.streams.clear();
        inner.event_ids.clear();
    }
}

fn ensure_not_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(EventStoreError::Cancelled);
    }
    Ok(())
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    #[tracing::instrument(skip(self, events, cancel), fields(count = events.len()))]
    async fn append_events(
        &self,
        stream: &StreamName,
        events: Vec<StreamEvent>,
        expected: ExpectedStreamVersion,
        cancel: &CancellationToken,
    ) -> Result<AppendResult> {
        validate_events_for_append(&events)?;
        ensure_not_cancelled(cancel)?;

        let mut inner = self.inner.write().await;
        ensure_not_cancelled(cancel)?;

        let actual = inner
            .streams
            .get(stream)
            .map(|events| Version::initial().advance(events.len()));

        expected.check(stream, actual).inspect_err(observe_rejection)?;

        if let Some(duplicate) = events.iter().find(|e| inner.event_ids.contains(&e.event_id)) {
            return Err(EventStoreError::InvalidAppend(format!(
                "event {} is already stored",
                duplicate.event_id
            )));
        }

        let count = events.len();
        inner.event_ids.extend(events.iter().map(|e| e.event_id));
        let (positioned, version) = position_events(events, actual.unwrap_or_default());
        inner.streams.entry(stream.clone()).or_default().extend(positioned);

        metrics::counter!("event_store_events_appended_total").increment(count as u64);
        tracing::debug!(%version, "appended events");

        Ok(AppendResult::new(version))
    }

    async fn get_stream_events(
        &self,
        stream: &StreamName,
        from: StreamReadPosition,
        cancel: &CancellationToken,
    ) -> Result<EventStream> {
        use futures_util::stream;

        ensure_not_cancelled(cancel)?;

        let inner = self.inner.read().await;
        let events: Vec<_> = inner
            .streams
            .get(stream)
            .map(|events| {
                events
                    .iter()
                    .filter(|e| e.stream_position().is_some_and(|p| p >= from.position()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        Ok(Box::pin(stream::iter(events.into_iter().map(Ok))))
    }

    async fn stream_version(
        &self,
        stream: &StreamName,
        cancel: &CancellationToken,
    ) -> Result<Option<Version>> {
        ensure_not_cancelled(cancel)?;

        let inner = self.inner.read().await;
        Ok(inner
            .streams
            .get(stream)
            .map(|events| Version::initial().advance(events.len())))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::{EventId, EventStoreExt};

    fn stream_name() -> StreamName {
        StreamName::new("TestAggregate", Uuid::new_v4().to_string()).unwrap()
    }

    fn create_test_event(event_type: &str) -> StreamEvent {
        StreamEvent::builder()
            .event_id(EventId::from_uuid(Uuid::new_v4()))
            .aggregate_id("test")
            .aggregate_sequence_number(Version::first())
            .event_type(event_type)
            .occurred_on(Utc::now())
            .payload_raw(serde_json::json!({"test": true}))
            .build()
    }

    fn token() -> CancellationToken {
        CancellationToken::new()
    }

    #[tokio::test]
    async fn append_single_event() {
        let store = InMemoryEventStore::new();
        let stream = stream_name();

        let result = store
            .append_event(
                &stream,
                create_test_event("TestEvent"),
                ExpectedStreamVersion::NoStream,
                &token(),
            )
            .await;
        assert_eq!(result.unwrap().next_expected_version, Version::first());

        let events = store
            .read_stream(&stream, StreamReadPosition::START, &token())
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].stream_position(), Some(Version::first()));
    }

    #[tokio::test]
    async fn append_multiple_events_reads_back_in_order() {
        let store = InMemoryEventStore::new();
        let stream = stream_name();

        let events = vec![
            create_test_event("Event1"),
            create_test_event("Event2"),
            create_test_event("Event3"),
        ];
        let ids: Vec<_> = events.iter().map(|e| e.event_id).collect();

        let result = store
            .append_events(&stream, events, ExpectedStreamVersion::NoStream, &token())
            .await
            .unwrap();
        assert_eq!(result.next_expected_version, Version::new(3));

        let stored = store
            .read_stream(&stream, StreamReadPosition::START, &token())
            .await
            .unwrap();
        assert_eq!(stored.iter().map(|e| e.event_id).collect::<Vec<_>>(), ids);
        assert_eq!(
            stored
                .iter()
                .map(|e| e.stream_position().unwrap().as_i64())
                .collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[tokio::test]
    async fn concurrency_conflict_on_stale_version_leaves_stream_unchanged() {
        let store = InMemoryEventStore::new();
        let stream = stream_name();

        store
            .append_events(
                &stream,
                vec![create_test_event("Event1"), create_test_event("Event2")],
                ExpectedStreamVersion::NoStream,
                &token(),
            )
            .await
            .unwrap();

        let result = store
            .append_event(
                &stream,
                create_test_event("Event3"),
                ExpectedStreamVersion::Exact(Version::first()),
                &token(),
            )
            .await;

        assert!(matches!(
            result,
            Err(EventStoreError::ConcurrencyConflict { actual, .. }) if actual == Version::new(2)
        ));
        let stored = store
            .read_stream(&stream, StreamReadPosition::START, &token())
            .await
            .unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[tokio::test]
    async fn append_with_matching_version_succeeds() {
        let store = InMemoryEventStore::new();
        let stream = stream_name();

        let first = store
            .append_event(
                &stream,
                create_test_event("Event1"),
                ExpectedStreamVersion::NoStream,
                &token(),
            )
            .await
            .unwrap();

        let second = store
            .append_event(
                &stream,
                create_test_event("Event2"),
                first.expected(),
                &token(),
            )
            .await
            .unwrap();

        assert_eq!(second.next_expected_version, Version::new(2));
    }

    #[tokio::test]
    async fn asserting_existence_of_missing_stream_fails() {
        let store = InMemoryEventStore::new();
        let stream = stream_name();

        let result = store
            .append_event(
                &stream,
                create_test_event("Event1"),
                ExpectedStreamVersion::Exact(Version::new(3)),
                &token(),
            )
            .await;
        assert!(matches!(result, Err(EventStoreError::StreamNotFound(_))));

        let result = store
            .append_event(
                &stream,
                create_test_event("Event1"),
                ExpectedStreamVersion::StreamExists,
                &token(),
            )
            .await;
        assert!(matches!(result, Err(EventStoreError::StreamNotFound(_))));
        assert!(!store.stream_exists(&stream, &token()).await.unwrap());
    }

    #[tokio::test]
    async fn empty_append_is_rejected() {
        let store = InMemoryEventStore::new();
        let result = store
            .append_events(&stream_name(), vec![], ExpectedStreamVersion::Any, &token())
            .await;
        assert!(matches!(result, Err(EventStoreError::InvalidAppend(_))));
    }

    #[tokio::test]
    async fn stream_exists_after_first_append() {
        let store = InMemoryEventStore::new();
        let stream = stream_name();

        assert!(!store.stream_exists(&stream, &token()).await.unwrap());

        store
            .append_event(
                &stream,
                create_test_event("Event1"),
                ExpectedStreamVersion::Any,
                &token(),
            )
            .await
            .unwrap();

        assert!(store.stream_exists(&stream, &token()).await.unwrap());
        assert_eq!(
            store.stream_version(&stream, &token()).await.unwrap(),
            Some(Version::first())
        );
    }

    #[tokio::test]
    async fn read_from_position_is_inclusive() {
        let store = InMemoryEventStore::new();
        let stream = stream_name();

        store
            .append_events(
                &stream,
                vec![
                    create_test_event("Event1"),
                    create_test_event("Event2"),
                    create_test_event("Event3"),
                ],
                ExpectedStreamVersion::Any,
                &token(),
            )
            .await
            .unwrap();

        let from_v2 = store
            .read_stream(&stream, StreamReadPosition::at(Version::new(2)), &token())
            .await
            .unwrap();
        assert_eq!(from_v2.len(), 2);
        assert_eq!(from_v2[0].event_type, "Event2");
        assert_eq!(from_v2[1].event_type, "Event3");
    }

    #[tokio::test]
    async fn missing_stream_reads_empty() {
        let store = InMemoryEventStore::new();
        let events = store
            .read_stream(&stream_name(), StreamReadPosition::START, &token())
            .await
            .unwrap();
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn reads_are_restartable() {
        let store = InMemoryEventStore::new();
        let stream = stream_name();
        store
            .append_events(
                &stream,
                vec![create_test_event("Event1"), create_test_event("Event2")],
                ExpectedStreamVersion::Any,
                &token(),
            )
            .await
            .unwrap();

        let first = store
            .read_stream(&stream, StreamReadPosition::START, &token())
            .await
            .unwrap();
        let second = store
            .read_stream(&stream, StreamReadPosition::START, &token())
            .await
            .unwrap();
        assert_eq!(
            first.iter().map(|e| e.event_id).collect::<Vec<_>>(),
            second.iter().map(|e| e.event_id).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn streams_are_isolated() {
        let store = InMemoryEventStore::new();
        let a = stream_name();
        let b = stream_name();

        for stream in [&a, &b] {
            store
                .append_event(
                    stream,
                    create_test_event("Event1"),
                    ExpectedStreamVersion::NoStream,
                    &token(),
                )
                .await
                .unwrap();
        }

        assert_eq!(store.stream_count().await, 2);
        assert_eq!(store.event_count().await, 2);
        assert_eq!(
            store.stream_version(&a, &token()).await.unwrap(),
            Some(Version::first())
        );
    }

    #[tokio::test]
    async fn cancelled_append_changes_nothing() {
        let store = InMemoryEventStore::new();
        let stream = stream_name();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = store
            .append_event(
                &stream,
                create_test_event("Event1"),
                ExpectedStreamVersion::Any,
                &cancel,
            )
            .await;

        assert!(matches!(result, Err(EventStoreError::Cancelled)));
        assert_eq!(store.event_count().await, 0);
    }

    #[tokio::test]
    async fn concurrent_writers_with_same_expectation_only_one_wins() {
        let store = InMemoryEventStore::new();
        let stream = stream_name();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            let stream = stream.clone();
            handles.push(tokio::spawn(async move {
                store
                    .append_event(
                        &stream,
                        create_test_event("Racer"),
                        ExpectedStreamVersion::NoStream,
                        &CancellationToken::new(),
                    )
                    .await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(err) => assert!(err.is_concurrency_conflict()),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(store.event_count().await, 1);
    }

    #[tokio::test]
    async fn already_stored_event_id_is_rejected_in_any_stream() {
        let store = InMemoryEventStore::new();
        let stream = stream_name();
        let event = create_test_event("Event1");

        store
            .append_event(&stream, event.clone(), ExpectedStreamVersion::Any, &token())
            .await
            .unwrap();

        let same_stream = store
            .append_event(&stream, event.clone(), ExpectedStreamVersion::Any, &token())
            .await;
        assert!(matches!(same_stream, Err(EventStoreError::InvalidAppend(_))));

        let other_stream = store
            .append_events(
                &stream_name(),
                vec![create_test_event("Event2"), event],
                ExpectedStreamVersion::Any,
                &token(),
            )
            .await;
        assert!(matches!(other_stream, Err(EventStoreError::InvalidAppend(_))));

        assert_eq!(store.event_count().await, 1);
        assert_eq!(store.stream_count().await, 1);
    }

    #[tokio::test]
    async fn cleared_store_accepts_previous_event_ids() {
        let store = InMemoryEventStore::new();
        let event = create_test_event("Event1");

        store
            .append_event(&stream_name(), event.clone(), ExpectedStreamVersion::Any, &token())
            .await
            .unwrap();
        store.clear().await;

        let result = store
            .append_event(&stream_name(), event, ExpectedStreamVersion::Any, &token())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn clear_removes_all_streams() {
        let store = InMemoryEventStore::new();
        store
            .append_event(
                &stream_name(),
                create_test_event("Event1"),
                ExpectedStreamVersion::Any,
                &token(),
            )
            .await
            .unwrap();

        store.clear().await;
        assert_eq!(store.event_count().await, 0);
    }
}
