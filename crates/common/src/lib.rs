//! Shared building blocks for the event-sourcing crates.
//!
//! - [`AggregateId`]: statically typed aggregate identifier
//! - [`Clock`] and [`IdGenerator`]: injectable sources of time and identity
//! - [`EventContext`]: the pair of them handed to event-raising code

pub mod clock;
pub mod context;
pub mod id;
pub mod types;

pub use clock::{Clock, SystemClock};
pub use context::EventContext;
pub use id::{IdGenerator, RandomIdGenerator};
pub use types::{AggregateId, IdValue};
