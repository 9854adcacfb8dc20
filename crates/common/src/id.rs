//! Identity generation seam.

use uuid::Uuid;

/// Source of fresh identifiers for events and aggregates.
pub trait IdGenerator: Send + Sync {
    /// Returns a new identifier.
    fn next_uuid(&self) -> Uuid;
}

/// Generates random (v4) UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn next_uuid(&self) -> Uuid {
        Uuid::new_v4()
    }
}
