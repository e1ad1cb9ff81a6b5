//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Operation timed out after {secs} seconds")]
    Timeout { secs: u64, stderr: Option<String> },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid media file: {0}")]
    InvalidMedia(String),

    #[error("Render failed: {0}")]
    RenderFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create a timeout error.
    pub fn timeout(secs: u64, stderr: Option<String>) -> Self {
        Self::Timeout { secs, stderr }
    }

    /// Create a render failure error.
    pub fn render_failed(message: impl Into<String>) -> Self {
        Self::RenderFailed(message.into())
    }

    /// Create an invalid media error.
    pub fn invalid_media(message: impl Into<String>) -> Self {
        Self::InvalidMedia(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Diagnostic output captured from the external process, if any.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            MediaError::FfmpegFailed { stderr, .. }
            | MediaError::FfprobeFailed { stderr, .. }
            | MediaError::Timeout { stderr, .. } => stderr.as_deref(),
            _ => None,
        }
    }

    /// Message including captured diagnostics, for failure descriptors.
    pub fn detailed_message(&self) -> String {
        match self.diagnostics().map(str::trim).filter(|s| !s.is_empty()) {
            Some(stderr) => format!("{self}: {stderr}"),
            None => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detailed_message_includes_stderr() {
        let err = MediaError::ffmpeg_failed(
            "FFmpeg exited with non-zero status",
            Some("Invalid data found when processing input\n".to_string()),
            Some(1),
        );
        assert_eq!(
            err.detailed_message(),
            "FFmpeg command failed: FFmpeg exited with non-zero status: Invalid data found when processing input"
        );
    }

    #[test]
    fn test_detailed_message_without_stderr() {
        assert_eq!(
            MediaError::timeout(30, None).detailed_message(),
            "Operation timed out after 30 seconds"
        );
    }

    #[test]
    fn test_timeout_carries_stderr() {
        let err = MediaError::timeout(30, Some("frame= 12 fps=0.0".to_string()));
        assert_eq!(err.diagnostics(), Some("frame= 12 fps=0.0"));
        assert_eq!(
            err.detailed_message(),
            "Operation timed out after 30 seconds: frame= 12 fps=0.0"
        );
    }
}
