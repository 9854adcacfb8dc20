//! Time and identity handed to code that raises domain events.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Clock, IdGenerator, RandomIdGenerator, SystemClock};

/// Bundles the [`Clock`] and [`IdGenerator`] used when stamping events.
///
/// Aggregate business methods take an `&EventContext` instead of reading the
/// system clock or generating ids themselves, so tests can pin both.
#[derive(Clone)]
pub struct EventContext {
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl EventContext {
    /// Creates a context from explicit clock and id generator.
    pub fn new(clock: impl Clock + 'static, ids: impl IdGenerator + 'static) -> Self {
        Self {
            clock: Arc::new(clock),
            ids: Arc::new(ids),
        }
    }

    /// Context backed by the system clock and random UUIDs.
    pub fn system() -> Self {
        Self::new(SystemClock, RandomIdGenerator)
    }

    /// Returns the current time according to the injected clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Returns a fresh identifier from the injected generator.
    pub fn next_id(&self) -> Uuid {
        self.ids.next_uuid()
    }

    /// Returns the id generator, e.g. for [`crate::AggregateId::generate`].
    pub fn ids(&self) -> &dyn IdGenerator {
        self.ids.as_ref()
    }
}

impl Default for EventContext {
    fn default() -> Self {
        Self::system()
    }
}

impl std::fmt::Debug for EventContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventContext").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Frozen(DateTime<Utc>);

    impl Clock for Frozen {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    struct Nil;

    impl IdGenerator for Nil {
        fn next_uuid(&self) -> Uuid {
            Uuid::nil()
        }
    }

    #[test]
    fn context_uses_injected_sources() {
        let at = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let ctx = EventContext::new(Frozen(at), Nil);

        assert_eq!(ctx.now(), at);
        assert_eq!(ctx.next_id(), Uuid::nil());
        assert_eq!(ctx.ids().next_uuid(), Uuid::nil());
    }
}
