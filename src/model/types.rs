//! Normalized entity structs shared by the catalog, filters and pagination.

use serde::{Deserialize, Serialize};

/// Page size used for every `faces` fetch. A page shorter than this is the
/// final page of a session.
pub const LIMIT: usize = 25;

/// Backend identifier of a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelId(pub i64);

impl std::fmt::Display for LabelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for LabelId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(LabelId)
    }
}

/// Opaque backend identifier of a detected face.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaceId(pub String);

impl FaceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FaceId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A user-assigned name for a group of faces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: LabelId,
    /// Display text. The backend calls this field `label`.
    #[serde(rename = "label")]
    pub text: String,
}

impl Label {
    pub fn new(id: i64, text: impl Into<String>) -> Self {
        Self {
            id: LabelId(id),
            text: text.into(),
        }
    }
}

/// A detected face as returned by the backend. Read-only on the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Face {
    pub id: FaceId,
    #[serde(default)]
    pub label_id: Option<LabelId>,
    /// Unix timestamp, seconds.
    pub capture_time: i64,
}

/// One fetch worth of faces, newest first.
pub type Page = Vec<Face>;
