//! Stream addressing and optimistic-concurrency types.

use serde::{Deserialize, Serialize};

use crate::{EventStoreError, Result, Version};

/// Name of an event stream, rendered as `"<category>-<id>"`.
///
/// The category never contains `-`, so a rendered name always splits back
/// into the same category and id on its first `-`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StreamName {
    category: String,
    id: String,
}

impl StreamName {
    /// Creates a stream name from a category and an id.
    pub fn new(category: impl Into<String>, id: impl Into<String>) -> Result<Self> {
        let category = category.into();
        let id = id.into();

        if category.is_empty() || id.is_empty() {
            return Err(EventStoreError::InvalidStreamName(format!(
                "category and id must be non-empty (got {category:?}, {id:?})"
            )));
        }
        if category.contains('-') {
            return Err(EventStoreError::InvalidStreamName(format!(
                "category {category:?} must not contain '-'"
            )));
        }

        Ok(Self { category, id })
    }

    /// Parses a rendered stream name.
    pub fn parse(raw: &str) -> Result<Self> {
        let (category, id) = raw.split_once('-').ok_or_else(|| {
            EventStoreError::InvalidStreamName(format!("{raw:?} has no '-' separator"))
        })?;
        Self::new(category, id)
    }

    /// Returns the stream category (usually the aggregate type).
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Returns the id part of the stream name.
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl std::fmt::Display for StreamName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.category, self.id)
    }
}

impl TryFrom<String> for StreamName {
    type Error = EventStoreError;

    fn try_from(raw: String) -> Result<Self> {
        Self::parse(&raw)
    }
}

impl From<StreamName> for String {
    fn from(stream: StreamName) -> Self {
        stream.to_string()
    }
}

/// Position from which a stream is read forward (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreamReadPosition(Version);

impl StreamReadPosition {
    /// The first position of every stream.
    pub const START: StreamReadPosition = StreamReadPosition(Version::FIRST);

    /// Reads starting at the given position.
    pub fn at(position: Version) -> Self {
        Self(position.max(Version::FIRST))
    }

    /// Reads starting right after the given version.
    pub fn after(version: Version) -> Self {
        Self::at(version.next())
    }

    /// Returns the first position that will be read.
    pub fn position(&self) -> Version {
        self.0
    }
}

impl Default for StreamReadPosition {
    fn default() -> Self {
        Self::START
    }
}

/// Optimistic-concurrency precondition for an append.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpectedStreamVersion {
    /// Append regardless of the stream's current version.
    Any,

    /// The stream must not exist yet.
    NoStream,

    /// The stream must already exist, at any version.
    StreamExists,

    /// The stream must be exactly at this version. `Exact(0)` is the same as
    /// [`ExpectedStreamVersion::NoStream`].
    Exact(Version),
}

impl ExpectedStreamVersion {
    /// Checks the precondition against the stream's actual version.
    ///
    /// `actual` is `None` when the stream has never been appended to.
    pub fn check(self, stream: &StreamName, actual: Option<Version>) -> Result<()> {
        let conflict = |actual: Version| EventStoreError::ConcurrencyConflict {
            stream: stream.clone(),
            expected: self,
            actual,
        };

        match (self, actual) {
            (ExpectedStreamVersion::Any, _) => Ok(()),
            (ExpectedStreamVersion::NoStream, None) => Ok(()),
            (ExpectedStreamVersion::NoStream, Some(actual)) => Err(conflict(actual)),
            (ExpectedStreamVersion::StreamExists, None) => {
                Err(EventStoreError::StreamNotFound(stream.clone()))
            }
            (ExpectedStreamVersion::StreamExists, Some(_)) => Ok(()),
            (ExpectedStreamVersion::Exact(expected), None) if expected == Version::initial() => {
                Ok(())
            }
            (ExpectedStreamVersion::Exact(_), None) => {
                Err(EventStoreError::StreamNotFound(stream.clone()))
            }
            (ExpectedStreamVersion::Exact(expected), Some(actual)) if expected == actual => Ok(()),
            (ExpectedStreamVersion::Exact(_), Some(actual)) => Err(conflict(actual)),
        }
    }
}

impl From<Version> for ExpectedStreamVersion {
    fn from(version: Version) -> Self {
        ExpectedStreamVersion::Exact(version)
    }
}

impl std::fmt::Display for ExpectedStreamVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExpectedStreamVersion::Any => write!(f, "any version"),
            ExpectedStreamVersion::NoStream => write!(f, "no stream"),
            ExpectedStreamVersion::StreamExists => write!(f, "an existing stream"),
            ExpectedStreamVersion::Exact(version) => write!(f, "version {version}"),
        }
    }
}

/// Outcome of a successful append.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendResult {
    /// Version of the stream after the append; pass it as the next
    /// expected version.
    pub next_expected_version: Version,
}

impl AppendResult {
    /// Creates a result for a stream now at `version`.
    pub fn new(version: Version) -> Self {
        Self {
            next_expected_version: version,
        }
    }

    /// Returns the precondition to use for the next append.
    pub fn expected(&self) -> ExpectedStreamVersion {
        ExpectedStreamVersion::Exact(self.next_expected_version)
    }
}
