//! Stored artifacts and their identifiers.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Number of hex characters in an artifact id.
pub const ARTIFACT_ID_LEN: usize = 8;

/// Error returned when parsing a malformed artifact id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid artifact id '{0}': expected 8 lowercase hex characters")]
pub struct ArtifactIdError(pub String);

/// Short unique identifier of a stored artifact.
///
/// Eight lowercase hex characters taken from a random v4 UUID. The shape is
/// validated on parse, so an id can always be embedded in a file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(try_from = "String", into = "String")]
pub struct ArtifactId(String);

impl ArtifactId {
    /// Generate a new random artifact id.
    pub fn generate() -> Self {
        let mut hex = Uuid::new_v4().simple().to_string();
        hex.truncate(ARTIFACT_ID_LEN);
        Self(hex)
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ArtifactId {
    type Err = ArtifactIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid = s.len() == ARTIFACT_ID_LEN
            && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(ArtifactIdError(s.to_string()))
        }
    }
}

impl TryFrom<String> for ArtifactId {
    type Error = ArtifactIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ArtifactId> for String {
    fn from(id: ArtifactId) -> Self {
        id.0
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What an artifact contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Muxed MP4 (H.264 + AAC)
    Video,
    /// Narration only (degraded mode)
    AudioOnly,
}

impl ArtifactKind {
    /// Lookup order used when resolving an id without an index.
    pub const PRIORITY: [ArtifactKind; 2] = [ArtifactKind::Video, ArtifactKind::AudioOnly];

    /// File name prefix.
    pub fn prefix(&self) -> &'static str {
        match self {
            ArtifactKind::Video => "video",
            ArtifactKind::AudioOnly => "audio",
        }
    }

    /// File extension (without dot).
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Video => "mp4",
            ArtifactKind::AudioOnly => "mp3",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ArtifactKind::Video => "video/mp4",
            ArtifactKind::AudioOnly => "audio/mpeg",
        }
    }

    /// File name of the artifact `id` of this kind: `{prefix}_{id}.{ext}`.
    pub fn file_name(&self, id: &ArtifactId) -> String {
        format!("{}_{}.{}", self.prefix(), id, self.extension())
    }

    /// Parse a stored file name back into `(kind, id)`.
    pub fn parse_file_name(name: &str) -> Option<(ArtifactKind, ArtifactId)> {
        Self::PRIORITY.into_iter().find_map(|kind| {
            let rest = name.strip_prefix(kind.prefix())?.strip_prefix('_')?;
            let id = rest.strip_suffix(kind.extension())?.strip_suffix('.')?;
            id.parse().ok().map(|id| (kind, id))
        })
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.prefix())
    }
}

/// A stored, retrievable output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct VideoArtifact {
    pub id: ArtifactId,
    pub path: PathBuf,
    pub kind: ArtifactKind,
    /// Taken from the file's modification time
    pub created_at: DateTime<Utc>,
}

impl VideoArtifact {
    /// Name offered to clients downloading the artifact.
    pub fn download_name(&self) -> String {
        format!("fact_insolite_{}.{}", self.id, self.kind.extension())
    }
}
