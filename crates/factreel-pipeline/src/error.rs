//! Mapping component errors onto failed stages.
//!
//! Every component error becomes a [`PipelineFailure`] at the orchestrator
//! boundary, tagged with the stage that was running.

use factreel_clients::ClientError;
use factreel_media::MediaError;
use factreel_models::{PipelineFailure, Stage};
use factreel_storage::StorageError;

/// Error text carried in a failure descriptor.
pub trait Diagnostic {
    fn diagnostic(&self) -> String;
}

impl Diagnostic for MediaError {
    fn diagnostic(&self) -> String {
        self.detailed_message()
    }
}

impl Diagnostic for ClientError {
    fn diagnostic(&self) -> String {
        self.to_string()
    }
}

impl Diagnostic for StorageError {
    fn diagnostic(&self) -> String {
        self.to_string()
    }
}

impl Diagnostic for std::io::Error {
    fn diagnostic(&self) -> String {
        self.to_string()
    }
}

impl Diagnostic for tokio::task::JoinError {
    fn diagnostic(&self) -> String {
        format!("worker task failed: {self}")
    }
}

/// Attach a stage to a component result.
pub trait StageContext<T> {
    fn at_stage(self, stage: Stage) -> Result<T, PipelineFailure>;
}

impl<T, E: Diagnostic> StageContext<T> for Result<T, E> {
    fn at_stage(self, stage: Stage) -> Result<T, PipelineFailure> {
        self.map_err(|e| PipelineFailure::new(stage, e.diagnostic()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_failure_keeps_stderr() {
        let result: Result<(), MediaError> = Err(MediaError::ffmpeg_failed(
            "FFmpeg exited with non-zero status",
            Some("frame.png: No such file or directory".to_string()),
            Some(1),
        ));
        let failure = result.at_stage(Stage::Muxing).unwrap_err();
        assert_eq!(failure.stage, Stage::Muxing);
        assert!(failure.message.contains("No such file or directory"));
    }

    #[test]
    fn test_mux_timeout_keeps_stderr() {
        let result: Result<(), MediaError> = Err(MediaError::timeout(
            300,
            Some("frame=  90 fps= 0.0 q=-1.0 size=256kB".to_string()),
        ));
        let failure = result.at_stage(Stage::Muxing).unwrap_err();
        assert_eq!(failure.stage, Stage::Muxing);
        assert!(failure.message.starts_with("Operation timed out after 300 seconds"));
        assert!(failure.message.contains("frame=  90"));
    }

    #[test]
    fn test_client_failure_stage() {
        let result: Result<(), ClientError> = Err(ClientError::EmptyText);
        let failure = result.at_stage(Stage::Synthesis).unwrap_err();
        assert_eq!(failure.stage, Stage::Synthesis);
        assert_eq!(failure.message, "Nothing to synthesize: text is empty");
    }
}
