//! Load-modify-store orchestration for event-sourced aggregates.

use common::AggregateId;
use event_store::{
    AppendResult, CancellationToken, EventStore, EventStoreExt, ExpectedStreamVersion,
    StreamEvent, StreamReadPosition, Version,
};

use crate::aggregate::{Aggregate, DomainEvent, EventRecord};
use crate::error::DomainError;
use crate::factory::AggregateFactory;
use crate::fold::AggregateStreamExt;

/// Loads aggregates from, and stores their new events to, an event store.
///
/// The store is responsible for:
/// 1. Checking whether an aggregate's stream exists
/// 2. Rebuilding an aggregate by folding its stream from the start
/// 3. Appending an aggregate's uncommitted events with a version check
///
/// It keeps no per-aggregate state, so one instance can be shared by many
/// tasks. Concurrency conflicts are returned to the caller, never retried.
#[derive(Debug, Clone)]
pub struct AggregateStore<S> {
    store: S,
    correlation_id: Option<String>,
}

impl<S: EventStore> AggregateStore<S> {
    /// Creates a new aggregate store over the given event store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            correlation_id: None,
        }
    }

    /// Tags every stored event with the given correlation id.
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Returns a reference to the underlying event store.
    pub fn event_store(&self) -> &S {
        &self.store
    }

    /// Returns true if the aggregate's stream holds any events.
    #[tracing::instrument(skip(self, cancel), fields(aggregate_type = A::aggregate_type()))]
    pub async fn exists<A: Aggregate>(
        &self,
        id: &AggregateId<A::Id>,
        cancel: &CancellationToken,
    ) -> Result<bool, DomainError> {
        let stream = A::stream_name(id)?;
        Ok(self.store.stream_exists(&stream, cancel).await?)
    }

    /// Loads an aggregate by folding its whole stream.
    ///
    /// Returns None if nothing has ever been stored for `id`.
    #[tracing::instrument(skip(self, cancel), fields(aggregate_type = A::aggregate_type()))]
    pub async fn get<A: Aggregate>(
        &self,
        id: &AggregateId<A::Id>,
        cancel: &CancellationToken,
    ) -> Result<Option<A>, DomainError> {
        let stream = A::stream_name(id)?;

        let aggregate = self
            .store
            .aggregate_stream(
                &stream,
                StreamReadPosition::START,
                AggregateFactory::<A>::create(),
                A::apply,
                cancel,
            )
            .await?;

        metrics::counter!("aggregate_store_loads_total", "aggregate_type" => A::aggregate_type())
            .increment(1);

        if aggregate.current_version() == Version::initial() {
            tracing::debug!(%stream, "aggregate not found");
            return Ok(None);
        }

        tracing::debug!(%stream, version = %aggregate.current_version(), "loaded aggregate");
        Ok(Some(aggregate))
    }

    /// Loads an aggregate, failing with `AggregateNotFound` if it has no stream.
    pub async fn get_required<A: Aggregate>(
        &self,
        id: &AggregateId<A::Id>,
        cancel: &CancellationToken,
    ) -> Result<A, DomainError> {
        self.get::<A>(id, cancel)
            .await?
            .ok_or_else(|| DomainError::AggregateNotFound {
                aggregate_type: A::aggregate_type(),
                aggregate_id: id.to_string(),
            })
    }

    /// Appends the aggregate's uncommitted events to its stream.
    ///
    /// On success the buffer is cleared and the original version moves up to
    /// the current version. On failure the aggregate is left untouched, so the
    /// caller can inspect it, or reload and retry the whole intent.
    /// An aggregate with nothing to store causes no I/O.
    #[tracing::instrument(
        skip(self, aggregate, cancel),
        fields(aggregate_type = A::aggregate_type())
    )]
    pub async fn store<A: Aggregate>(
        &self,
        aggregate: &mut A,
        expected: ExpectedStreamVersion,
        cancel: &CancellationToken,
    ) -> Result<AppendResult, DomainError> {
        if aggregate.uncommitted_events().is_empty() {
            return Ok(AppendResult::new(aggregate.current_version()));
        }

        let id = aggregate.id().ok_or(DomainError::MissingAggregateId {
            aggregate_type: A::aggregate_type(),
        })?;
        let stream = A::stream_name(&id)?;

        let events = aggregate
            .uncommitted_events()
            .iter()
            .map(|record| self.to_stream_event(&id, record))
            .collect::<Result<Vec<_>, _>>()?;

        let result = self
            .store
            .append_events(&stream, events, expected, cancel)
            .await?;

        aggregate.sourcing_mut().mark_committed();
        tracing::debug!(%stream, version = %result.next_expected_version, "stored aggregate");

        Ok(result)
    }

    fn to_stream_event<E: DomainEvent, I: common::IdValue>(
        &self,
        id: &AggregateId<I>,
        record: &EventRecord<E, I>,
    ) -> Result<StreamEvent, DomainError> {
        let mut builder = StreamEvent::builder()
            .event_id(record.event_id)
            .event_type(record.data.event_type())
            .aggregate_id(record.aggregate_id.as_ref().unwrap_or(id))
            .aggregate_sequence_number(record.aggregate_sequence_number)
            .occurred_on(record.occurred_on)
            .payload(&record.data)?
            .causation_id(record.event_id.to_string());

        if let Some(correlation_id) = &self.correlation_id {
            builder = builder.correlation_id(correlation_id.clone());
        }

        Ok(builder.build())
    }
}
