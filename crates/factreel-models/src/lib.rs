//! Shared data models for the FactReel rendering pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Content records received at the input boundary
//! - Text blocks, colors and font roles used by the frame composer
//! - Artifact identifiers, kinds and stored artifacts
//! - Encoding configuration for the muxer
//! - Pipeline stages and run outcomes

pub mod artifact;
pub mod content;
pub mod encoding;
pub mod pipeline;
pub mod render;

// Re-export common types
pub use artifact::{ArtifactId, ArtifactIdError, ArtifactKind, VideoArtifact};
pub use content::{ContentRecord, ContentRecordError};
pub use encoding::EncodingConfig;
pub use pipeline::{AudioTrack, PipelineFailure, PipelineResult, PipelineSuccess, Stage};
pub use render::{FontRole, Rgb, TextBlock};
