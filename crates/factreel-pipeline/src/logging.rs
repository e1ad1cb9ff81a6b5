//! Structured run logging utilities.
//!
//! Every line carries the run id (the artifact id reserved for the run) and
//! the stage it refers to.

use tracing::{error, info, warn, Span};

use factreel_models::{ArtifactId, PipelineFailure, Stage};

/// Run logger for structured logging with consistent formatting.
#[derive(Debug, Clone)]
pub struct RunLogger {
    run_id: String,
    mode: &'static str,
}

impl RunLogger {
    /// Create a logger for the run producing `id`.
    pub fn new(id: &ArtifactId, mode: &'static str) -> Self {
        Self {
            run_id: id.to_string(),
            mode,
        }
    }

    /// Log the start of a run.
    pub fn log_start(&self, message: &str) {
        info!(run_id = %self.run_id, mode = self.mode, "Run started: {}", message);
    }

    /// Log entry into a stage.
    pub fn log_progress(&self, stage: Stage, message: &str) {
        info!(
            run_id = %self.run_id,
            stage = %stage,
            "Run progress: {}", message
        );
    }

    /// Log a non-fatal degradation.
    pub fn log_warning(&self, stage: &str, message: &str) {
        warn!(
            run_id = %self.run_id,
            stage = stage,
            "Run warning: {}", message
        );
    }

    /// Log a fatal failure.
    pub fn log_error(&self, failure: &PipelineFailure) {
        error!(
            run_id = %self.run_id,
            stage = %failure.stage,
            "Run failed: {}", failure.message
        );
    }

    /// Log the completion of a run.
    pub fn log_completion(&self, message: &str) {
        info!(run_id = %self.run_id, mode = self.mode, "Run completed: {}", message);
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Create a tracing span for this run.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("run", run_id = %self.run_id, mode = self.mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_logger_creation() {
        let id = ArtifactId::generate();
        let logger = RunLogger::new(&id, "video");
        assert_eq!(logger.run_id(), id.as_str());
    }
}
