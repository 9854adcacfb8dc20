//! Shared test helpers for the event-sourcing crates.
//!
//! - [`FixedClock`] and [`SequentialIdGenerator`] make event stamps
//!   predictable
//! - [`ShoppingCart`] is a small aggregate exercising every part of the
//!   aggregate lifecycle
//! - [`init_tracing`] routes `tracing` output through the test harness

pub mod cart;
pub mod clock;
pub mod ids;
pub mod logging;

pub use cart::{CartError, CartStatus, ShoppingCart, ShoppingCartEvent};
pub use clock::FixedClock;
pub use ids::SequentialIdGenerator;
pub use logging::init_tracing;

use common::EventContext;

/// A context with a fixed clock and sequential ids starting at 1.
pub fn deterministic_context() -> EventContext {
    EventContext::new(FixedClock::default(), SequentialIdGenerator::new())
}
