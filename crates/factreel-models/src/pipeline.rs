//! Pipeline stages and run outcomes.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::artifact::{ArtifactId, VideoArtifact};
use crate::content::ContentRecord;

/// Stage of a pipeline run that can abort it.
///
/// Image lookup and font problems degrade silently and have no stage here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ContentFetch,
    Synthesis,
    Composition,
    Muxing,
    Storage,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::ContentFetch => "content_fetch",
            Stage::Synthesis => "synthesis",
            Stage::Composition => "composition",
            Stage::Muxing => "muxing",
            Stage::Storage => "storage",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Failure descriptor returned for an aborted run.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize, JsonSchema)]
#[error("{stage} failed: {message}")]
pub struct PipelineFailure {
    pub stage: Stage,
    pub message: String,
}

impl PipelineFailure {
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }

    pub fn content_fetch(message: impl Into<String>) -> Self {
        Self::new(Stage::ContentFetch, message)
    }

    pub fn synthesis(message: impl Into<String>) -> Self {
        Self::new(Stage::Synthesis, message)
    }

    pub fn composition(message: impl Into<String>) -> Self {
        Self::new(Stage::Composition, message)
    }

    pub fn muxing(message: impl Into<String>) -> Self {
        Self::new(Stage::Muxing, message)
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(Stage::Storage, message)
    }
}

/// Successful run: the stored artifact plus the record that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSuccess {
    pub artifact: VideoArtifact,
    pub record: ContentRecord,
}

impl PipelineSuccess {
    pub fn artifact_id(&self) -> &ArtifactId {
        &self.artifact.id
    }
}

/// Outcome of one pipeline run.
pub type PipelineResult = Result<PipelineSuccess, PipelineFailure>;

/// A synthesized narration file and its probed duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioTrack {
    pub path: PathBuf,
    pub duration_seconds: f64,
}

impl AudioTrack {
    pub fn new(path: impl Into<PathBuf>, duration_seconds: f64) -> Self {
        Self {
            path: path.into(),
            duration_seconds,
        }
    }
}
