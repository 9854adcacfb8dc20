//! Core aggregate and domain event traits.

use std::fmt::Debug;

use chrono::{DateTime, Utc};
use common::{AggregateId, EventContext, IdValue};
use event_store::{EventId, StreamName, Version};
use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::error::DomainError;

/// Trait for domain events.
///
/// Domain events represent facts that have happened in the domain.
/// They are immutable and should be named in past tense. Each aggregate
/// declares one closed enum of events; the enum is stored whole, tagged
/// with its variant name, so `event_type` doubles as the stored
/// discriminator.
pub trait DomainEvent:
    Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static
{
    /// Every discriminator this event type can produce.
    ///
    /// Stored events whose type is not listed here cannot be folded.
    const EVENT_TYPES: &'static [&'static str];

    /// Returns the event type name.
    fn event_type(&self) -> &'static str;

    /// Returns true if `event_type` names one of this type's variants.
    fn is_known(event_type: &str) -> bool {
        Self::EVENT_TYPES.contains(&event_type)
    }
}

/// A domain event stamped with identity and ordering information.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord<E, I = Uuid> {
    /// Unique identifier for this event.
    pub event_id: EventId,

    /// When the event occurred, as seen by the injected clock.
    pub occurred_on: DateTime<Utc>,

    /// Aggregate that raised the event. Known once the creating event has
    /// been applied.
    pub aggregate_id: Option<AggregateId<I>>,

    /// Sequence number of the event within its aggregate.
    pub aggregate_sequence_number: Version,

    /// The event itself.
    pub data: E,
}

/// Versioning and uncommitted-event bookkeeping embedded in every aggregate.
///
/// `current_version` always equals `original_version` plus the number of
/// uncommitted events.
#[derive(Debug, Clone)]
pub struct EventSourcingState<E, I = Uuid> {
    original_version: Version,
    current_version: Version,
    uncommitted: Vec<EventRecord<E, I>>,
}

impl<E, I> EventSourcingState<E, I> {
    /// Version the aggregate had when it was loaded or last stored.
    pub fn original_version(&self) -> Version {
        self.original_version
    }

    /// Version including events applied since the last load or store.
    pub fn current_version(&self) -> Version {
        self.current_version
    }

    /// Events applied since the last load or store, in application order.
    pub fn uncommitted_events(&self) -> &[EventRecord<E, I>] {
        &self.uncommitted
    }

    /// Returns true if there are events waiting to be stored.
    pub fn has_uncommitted_events(&self) -> bool {
        !self.uncommitted.is_empty()
    }

    pub(crate) fn push(&mut self, record: EventRecord<E, I>) {
        self.current_version = record.aggregate_sequence_number;
        self.uncommitted.push(record);
    }

    /// Clears the buffer after the events reached the store.
    pub(crate) fn mark_committed(&mut self) {
        self.uncommitted.clear();
        self.original_version = self.current_version;
    }

    /// Records that the aggregate was rebuilt up to `version`.
    pub(crate) fn mark_loaded(&mut self, version: Version) {
        self.uncommitted.clear();
        self.original_version = version;
        self.current_version = version;
    }
}

impl<E, I> Default for EventSourcingState<E, I> {
    fn default() -> Self {
        Self {
            original_version: Version::initial(),
            current_version: Version::initial(),
            uncommitted: Vec::new(),
        }
    }
}

/// Trait for aggregates in an event-sourced system.
///
/// An aggregate is a cluster of domain objects that can be treated as a single unit.
/// The aggregate root ensures consistency of changes being made within the aggregate.
///
/// In event sourcing, aggregates:
/// - Are rebuilt by replaying events
/// - Generate events from business methods through [`Aggregate::apply_event`]
/// - Apply events to update state (pure, deterministic)
pub trait Aggregate: Default + Send + Sync + Sized {
    /// Primitive type backing this aggregate's identifier.
    type Id: IdValue;

    /// The type of events this aggregate produces and consumes.
    type Event: DomainEvent;

    /// Returns the aggregate type name.
    ///
    /// Used as the stream category, so it must not contain `-`.
    fn aggregate_type() -> &'static str;

    /// Returns the aggregate's unique identifier.
    ///
    /// Returns None for a new, uninitialized aggregate.
    fn id(&self) -> Option<AggregateId<Self::Id>>;

    /// Applies an event to the aggregate, updating its state.
    ///
    /// This method must be pure and deterministic:
    /// - Given the same state and event, it must always produce the same new state
    /// - It must not have side effects
    /// - It must not fail (events represent facts that have happened)
    fn apply(&mut self, event: &Self::Event);

    /// Returns the embedded event-sourcing state.
    fn sourcing(&self) -> &EventSourcingState<Self::Event, Self::Id>;

    /// Returns the embedded event-sourcing state mutably.
    fn sourcing_mut(&mut self) -> &mut EventSourcingState<Self::Event, Self::Id>;

    /// Records a new event: folds it into state and buffers it for storing.
    fn apply_event(&mut self, event: Self::Event, ctx: &EventContext) {
        self.apply(&event);

        let record = EventRecord {
            event_id: EventId::from_uuid(ctx.next_id()),
            occurred_on: ctx.now(),
            aggregate_id: self.id(),
            aggregate_sequence_number: self.current_version().next(),
            data: event,
        };
        self.sourcing_mut().push(record);
    }

    /// Applies multiple historical events in sequence without buffering them.
    fn apply_events<'a>(&mut self, events: impl IntoIterator<Item = &'a Self::Event>) {
        for event in events {
            self.apply(event);
        }
    }

    /// Returns the name of the stream that holds this aggregate type's events.
    fn stream_name(id: &AggregateId<Self::Id>) -> Result<StreamName, DomainError> {
        Ok(StreamName::new(Self::aggregate_type(), id.to_string())?)
    }

    /// Version at load time, or after the last successful store.
    fn original_version(&self) -> Version {
        self.sourcing().original_version()
    }

    /// Version including uncommitted events.
    fn current_version(&self) -> Version {
        self.sourcing().current_version()
    }

    /// Events applied since the last load or store.
    fn uncommitted_events(&self) -> &[EventRecord<Self::Event, Self::Id>] {
        self.sourcing().uncommitted_events()
    }
}
