//! Pipeline configuration.

use std::path::PathBuf;
use std::str::FromStr;

use factreel_media::mux::DEFAULT_MUX_TIMEOUT_SECS;
use factreel_media::FontConfig;
use factreel_models::encoding::{DEFAULT_CRF, DEFAULT_TRAILING_PAD_SECS};
use factreel_models::EncodingConfig;

/// What a run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineMode {
    /// Frame + narration muxed into an MP4
    #[default]
    Video,
    /// Narration only, stored as MP3
    AudioOnly,
}

impl FromStr for PipelineMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "video" => Ok(PipelineMode::Video),
            "audio_only" | "audio-only" | "audio" => Ok(PipelineMode::AudioOnly),
            other => Err(format!("unknown pipeline mode '{other}'")),
        }
    }
}

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Artifact working directory
    pub work_dir: PathBuf,
    /// Narration language code
    pub language: String,
    /// Output encoding, including the trailing pad
    pub encoding: EncodingConfig,
    /// Timeout for one mux invocation
    pub mux_timeout_secs: u64,
    /// Maximum runs executing at once
    pub max_concurrent_runs: usize,
    /// Optional font files
    pub fonts: FontConfig,
    pub mode: PipelineMode,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("/tmp/videos"),
            language: "fr".to_string(),
            encoding: EncodingConfig::default(),
            mux_timeout_secs: DEFAULT_MUX_TIMEOUT_SECS,
            max_concurrent_runs: 2,
            fonts: FontConfig::default(),
            mode: PipelineMode::Video,
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let trailing_pad = std::env::var("FACTREEL_TRAILING_PAD_SECS")
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
            .unwrap_or(DEFAULT_TRAILING_PAD_SECS);
        let crf = std::env::var("FACTREEL_CRF")
            .ok()
            .and_then(|s| s.parse::<u8>().ok())
            .unwrap_or(DEFAULT_CRF);

        Self {
            work_dir: std::env::var("FACTREEL_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/tmp/videos")),
            language: std::env::var("FACTREEL_LANGUAGE").unwrap_or_else(|_| "fr".to_string()),
            encoding: EncodingConfig::default()
                .with_trailing_pad(trailing_pad)
                .with_crf(crf),
            mux_timeout_secs: std::env::var("FACTREEL_MUX_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_MUX_TIMEOUT_SECS),
            max_concurrent_runs: std::env::var("FACTREEL_MAX_CONCURRENT_RUNS")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(2),
            fonts: FontConfig::new(
                std::env::var("FACTREEL_TITLE_FONT").ok().map(PathBuf::from),
                std::env::var("FACTREEL_BODY_FONT").ok().map(PathBuf::from),
            ),
            mode: std::env::var("FACTREEL_MODE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
        }
    }

    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    pub fn with_mode(mut self, mode: PipelineMode) -> Self {
        self.mode = mode;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.work_dir, PathBuf::from("/tmp/videos"));
        assert_eq!(config.language, "fr");
        assert_eq!(config.max_concurrent_runs, 2);
        assert_eq!(config.mode, PipelineMode::Video);
        assert!((config.encoding.trailing_pad_secs - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("video".parse::<PipelineMode>(), Ok(PipelineMode::Video));
        assert_eq!("AUDIO_ONLY".parse::<PipelineMode>(), Ok(PipelineMode::AudioOnly));
        assert!("slideshow".parse::<PipelineMode>().is_err());
    }
}
