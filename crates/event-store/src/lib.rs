//! Append-only event stream storage.
//!
//! Streams are addressed by [`StreamName`]; every append carries an
//! [`ExpectedStreamVersion`] and either lands completely at the next
//! contiguous positions or fails without touching the stream.

pub mod config;
pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod retry;
pub mod store;
pub mod stream;

pub use config::EventStoreConfig;
pub use error::{EventStoreError, Result};
pub use event::{EventId, StreamEvent, StreamEventBuilder, StreamEventMetadata, Version};
pub use memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use retry::RetryPolicy;
pub use store::{EventStore, EventStoreExt, EventStream};
pub use stream::{AppendResult, ExpectedStreamVersion, StreamName, StreamReadPosition};
pub use tokio_util::sync::CancellationToken;
