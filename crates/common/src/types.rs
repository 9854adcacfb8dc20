use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::str::FromStr;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::IdGenerator;

/// Primitive types that can back an [`AggregateId`].
///
/// Implemented for anything that is hashable, printable, parseable and
/// serializable, which covers `Uuid`, `i64`, `u64` and `String`.
pub trait IdValue:
    Clone + Eq + Hash + Debug + Display + Send + Sync + Serialize + DeserializeOwned + 'static
{
    /// Parses the value back from its `Display` form.
    fn parse_id(raw: &str) -> Option<Self>;
}

impl<T> IdValue for T
where
    T: Clone
        + Eq
        + Hash
        + Debug
        + Display
        + FromStr
        + Send
        + Sync
        + Serialize
        + DeserializeOwned
        + 'static,
{
    fn parse_id(raw: &str) -> Option<Self> {
        raw.parse().ok()
    }
}

/// Unique identifier for an aggregate instance.
///
/// Generic over the underlying primitive so that each aggregate type fixes
/// its identifier representation at compile time. Defaults to `Uuid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregateId<T = Uuid>(T);

impl<T: IdValue> AggregateId<T> {
    /// Wraps an existing primitive value.
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Returns a reference to the underlying value.
    pub fn value(&self) -> &T {
        &self.0
    }

    /// Consumes the identifier, returning the underlying value.
    pub fn into_inner(self) -> T {
        self.0
    }

    /// Parses an identifier from its rendered form.
    pub fn parse(raw: &str) -> Option<Self> {
        T::parse_id(raw).map(Self)
    }
}

impl AggregateId<Uuid> {
    /// Creates a new identifier from the given generator.
    pub fn generate(ids: &dyn IdGenerator) -> Self {
        Self(ids.next_uuid())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl<T: Display> Display for AggregateId<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for AggregateId<Uuid> {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<i64> for AggregateId<i64> {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<AggregateId<Uuid>> for Uuid {
    fn from(id: AggregateId<Uuid>) -> Self {
        id.0
    }
}
