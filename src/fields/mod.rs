//! Path-addressed field mutation and cross-kind field search.

pub mod mutator;
pub mod search;

pub use mutator::FieldMutator;
pub use search::FieldSearchDispatcher;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{RecordFoldError, RecordFoldResult};

/// Ordered key sequence locating a value inside a document.
///
/// Decodes from a JSON array of strings and integers (`["ports", 0]`) or a
/// dotted string (`"network.mode"`). Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPath", into = "Vec<String>")]
pub struct FieldPath(Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSegment {
    Key(String),
    Index(u64),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPath {
    Dotted(String),
    Segments(Vec<RawSegment>),
}

impl TryFrom<RawPath> for FieldPath {
    type Error = RecordFoldError;

    fn try_from(raw: RawPath) -> Result<Self, Self::Error> {
        match raw {
            RawPath::Dotted(s) => FieldPath::parse(&s),
            RawPath::Segments(segments) => FieldPath::new(segments.into_iter().map(|s| match s {
                RawSegment::Key(k) => k,
                RawSegment::Index(i) => i.to_string(),
            })),
        }
    }
}

impl From<FieldPath> for Vec<String> {
    fn from(path: FieldPath) -> Self {
        path.0
    }
}

impl FieldPath {
    pub fn new<I, S>(segments: I) -> RecordFoldResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(RecordFoldError::Validation("field path must not be empty".into()));
        }
        if let Some(pos) = segments.iter().position(|s| s.is_empty()) {
            return Err(RecordFoldError::Validation(format!(
                "field path segment #{} must not be empty",
                pos
            )));
        }
        Ok(Self(segments))
    }

    /// Parse a dotted path such as `network.ports.0`.
    pub fn parse(dotted: &str) -> RecordFoldResult<Self> {
        Self::new(dotted.trim().split('.'))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}
