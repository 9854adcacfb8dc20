//! Deterministic `Clock` implementation for tests.

use chrono::{DateTime, TimeZone, Utc};
use common::Clock;

/// A clock that always returns a fixed point in time.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

impl Default for FixedClock {
    /// 2024-01-01T00:00:00Z.
    fn default() -> Self {
        Self(Utc.timestamp_opt(1_704_067_200, 0).single().unwrap_or_default())
    }
}
