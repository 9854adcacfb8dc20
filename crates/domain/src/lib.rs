//! Domain layer for the event-sourcing system.
//!
//! This crate provides the core domain abstractions including:
//! - Aggregate trait for event-sourced entities, with their embedded
//!   [`EventSourcingState`] and uncommitted-event buffer
//! - DomainEvent trait for closed, tagged event enums
//! - Event folding over any [`event_store::EventStore`]
//! - AggregateStore for the load-modify-store cycle

pub mod aggregate;
pub mod aggregate_store;
pub mod error;
pub mod factory;
pub mod fold;

pub use aggregate::{Aggregate, DomainEvent, EventRecord, EventSourcingState};
pub use aggregate_store::AggregateStore;
pub use error::DomainError;
pub use factory::AggregateFactory;
pub use fold::{AggregateStreamExt, decode_event};
