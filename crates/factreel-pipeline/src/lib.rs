//! Fact-to-video pipeline.
//!
//! Sequences narration synthesis, frame composition, muxing and storage for
//! one content record, reporting either the stored artifact or the stage
//! that failed.

pub mod audio;
pub mod config;
pub mod error;
pub mod logging;
pub mod orchestrator;

pub use audio::AudioTrackAcquirer;
pub use config::{PipelineConfig, PipelineMode};
pub use error::{Diagnostic, StageContext};
pub use logging::RunLogger;
pub use orchestrator::{Pipeline, PipelineBuilder};

pub use factreel_models::{PipelineFailure, PipelineResult, PipelineSuccess, Stage};
