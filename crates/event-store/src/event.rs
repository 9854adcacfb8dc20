use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

/// Unique identifier for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates an event ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for EventId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<EventId> for Uuid {
    fn from(id: EventId) -> Self {
        id.0
    }
}

/// Version of a stream, and position of an event within its stream.
///
/// Positions are one-based: the first event of a stream sits at position 1,
/// and a stream's version is the position of its last event. Version 0 means
/// the stream holds no events.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Version of an empty stream.
    pub const INITIAL: Version = Version(0);

    /// Position of the first event in a stream.
    pub const FIRST: Version = Version(1);

    /// Creates a new version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the initial version (0) of an empty stream.
    pub fn initial() -> Self {
        Self::INITIAL
    }

    /// Returns the position (1) of the first event.
    pub fn first() -> Self {
        Self::FIRST
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns this version advanced by `count` events.
    pub fn advance(&self, count: usize) -> Self {
        Self(self.0 + count as i64)
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Version> for i64 {
    fn from(version: Version) -> Self {
        version.0
    }
}

/// Stream-level metadata attached to a stored event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamEventMetadata {
    /// Identifier of the event this metadata describes.
    pub event_id: EventId,

    /// Position of the event within its stream. Assigned by the store.
    pub stream_position: Version,

    /// Identifier of whatever caused this event.
    pub causation_id: Option<String>,

    /// Identifier shared by every event raised for the same request.
    pub correlation_id: Option<String>,
}

impl StreamEventMetadata {
    /// Creates metadata for an event at the given position.
    pub fn new(event_id: EventId, stream_position: Version) -> Self {
        Self {
            event_id,
            stream_position,
            causation_id: None,
            correlation_id: None,
        }
    }
}

/// A domain event wrapped with everything needed to store it in a stream.
///
/// The payload is opaque to the store; `event_type` is the discriminator
/// readers use to decode it back into a typed event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamEvent {
    /// Unique identifier for this event.
    pub event_id: EventId,

    /// The type of the event (e.g., "ShoppingCartInitialized").
    pub event_type: String,

    /// Rendered identifier of the aggregate that raised the event.
    pub aggregate_id: String,

    /// Sequence number of the event within its aggregate.
    pub aggregate_sequence_number: Version,

    /// When the event occurred.
    pub occurred_on: DateTime<Utc>,

    /// The event payload as JSON.
    pub payload: serde_json::Value,

    /// Stream metadata. Always present on events read back from a store.
    pub metadata: Option<StreamEventMetadata>,
}

impl StreamEvent {
    /// Creates a new stream event builder.
    pub fn builder() -> StreamEventBuilder {
        StreamEventBuilder::default()
    }

    /// Returns the stream position, if the event has been stored.
    pub fn stream_position(&self) -> Option<Version> {
        self.metadata.as_ref().map(|m| m.stream_position)
    }

    /// Deserializes the payload into a concrete type.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }

    /// Returns a copy of this event positioned at `position`.
    ///
    /// Caller-supplied causation and correlation ids are kept.
    pub(crate) fn at_position(mut self, position: Version) -> Self {
        let metadata = match self.metadata.take() {
            Some(mut metadata) => {
                metadata.event_id = self.event_id;
                metadata.stream_position = position;
                metadata
            }
            None => StreamEventMetadata::new(self.event_id, position),
        };
        self.metadata = Some(metadata);
        self
    }
}

/// Builder for constructing stream events.
#[derive(Debug, Default)]
pub struct StreamEventBuilder {
    event_id: Option<EventId>,
    event_type: Option<String>,
    aggregate_id: Option<String>,
    aggregate_sequence_number: Option<Version>,
    occurred_on: Option<DateTime<Utc>>,
    payload: Option<serde_json::Value>,
    causation_id: Option<String>,
    correlation_id: Option<String>,
}

impl StreamEventBuilder {
    /// Sets the event ID.
    pub fn event_id(mut self, id: EventId) -> Self {
        self.event_id = Some(id);
        self
    }

    /// Sets the event type.
    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    /// Sets the aggregate ID from anything printable.
    pub fn aggregate_id(mut self, id: impl std::fmt::Display) -> Self {
        self.aggregate_id = Some(id.to_string());
        self
    }

    /// Sets the aggregate sequence number.
    pub fn aggregate_sequence_number(mut self, sequence: Version) -> Self {
        self.aggregate_sequence_number = Some(sequence);
        self
    }

    /// Sets when the event occurred.
    pub fn occurred_on(mut self, occurred_on: DateTime<Utc>) -> Self {
        self.occurred_on = Some(occurred_on);
        self
    }

    /// Sets the payload from a serializable value.
    pub fn payload<T: Serialize>(mut self, payload: &T) -> Result<Self, serde_json::Error> {
        self.payload = Some(serde_json::to_value(payload)?);
        Ok(self)
    }

    /// Sets the payload from a raw JSON value.
    pub fn payload_raw(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Sets the causation ID.
    pub fn causation_id(mut self, id: impl Into<String>) -> Self {
        self.causation_id = Some(id.into());
        self
    }

    /// Sets the correlation ID.
    pub fn correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Builds the stream event.
    ///
    /// # Panics
    ///
    /// Panics if required fields (event_id, event_type, aggregate_id,
    /// aggregate_sequence_number, occurred_on, payload) are not set.
    pub fn build(self) -> StreamEvent {
        self.try_build()
            .expect("stream event is missing a required field")
    }

    /// Tries to build the stream event, returning None if required fields are missing.
    pub fn try_build(self) -> Option<StreamEvent> {
        let event_id = self.event_id?;
        let metadata = if self.causation_id.is_some() || self.correlation_id.is_some() {
            Some(StreamEventMetadata {
                event_id,
                stream_position: Version::initial(),
                causation_id: self.causation_id,
                correlation_id: self.correlation_id,
            })
        } else {
            None
        };

        Some(StreamEvent {
            event_id,
            event_type: self.event_type?,
            aggregate_id: self.aggregate_id?,
            aggregate_sequence_number: self.aggregate_sequence_number?,
            occurred_on: self.occurred_on?,
            payload: self.payload?,
            metadata,
        })
    }
}
