//! Still frame + narration muxing.
//!
//! The output holds the frame for the narration plus a fixed trailing pad:
//! the audio is padded with silence (`apad`), the duration is capped with
//! `-t`, and `-shortest` bounds the otherwise infinite looped image.

use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, info};

use factreel_models::{AudioTrack, EncodingConfig};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// Default timeout for one mux invocation.
pub const DEFAULT_MUX_TIMEOUT_SECS: u64 = 300;

/// Combines one still frame and one audio track into a video file.
#[async_trait]
pub trait Muxer: Send + Sync {
    async fn mux(&self, frame: &Path, audio: &AudioTrack, output: &Path) -> MediaResult<()>;
}

/// [`Muxer`] that shells out to `ffmpeg`. Never retries.
#[derive(Debug, Clone)]
pub struct FfmpegMuxer {
    encoding: EncodingConfig,
    timeout_secs: u64,
}

impl Default for FfmpegMuxer {
    fn default() -> Self {
        Self::new(EncodingConfig::default())
    }
}

impl FfmpegMuxer {
    pub fn new(encoding: EncodingConfig) -> Self {
        Self {
            encoding,
            timeout_secs: DEFAULT_MUX_TIMEOUT_SECS,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn encoding(&self) -> &EncodingConfig {
        &self.encoding
    }
}

#[async_trait]
impl Muxer for FfmpegMuxer {
    async fn mux(&self, frame: &Path, audio: &AudioTrack, output: &Path) -> MediaResult<()> {
        let cmd = build_mux_command(&self.encoding, frame, audio, output);
        info!(
            audio_secs = audio.duration_seconds,
            output_secs = self.encoding.output_duration(audio.duration_seconds),
            "Muxing {}",
            output.display()
        );

        FfmpegRunner::new()
            .with_timeout(self.timeout_secs)
            .run(&cmd)
            .await?;

        debug!("Mux complete: {}", output.display());
        Ok(())
    }
}

/// Build the FFmpeg invocation for a looped still frame over `audio`.
pub fn build_mux_command(
    encoding: &EncodingConfig,
    frame: &Path,
    audio: &AudioTrack,
    output: &Path,
) -> FfmpegCommand {
    let pad = encoding.trailing_pad_secs.max(0.0);
    let total = encoding.output_duration(audio.duration_seconds);

    let cmd = FfmpegCommand::new(output)
        .input_with_args(
            frame,
            ["-loop".to_string(), "1".to_string(), "-framerate".to_string(), encoding.fps.to_string()],
        )
        .input(&audio.path)
        .output_args(["-map", "0:v:0", "-map", "1:a:0"])
        .output_args(encoding.to_ffmpeg_args());

    let cmd = if pad > 0.0 {
        cmd.audio_filter(format!("apad=pad_dur={:.3}", pad))
    } else {
        cmd
    };

    cmd.duration(total)
        .shortest()
        .output_args(["-movflags", "+faststart"])
}
