//! Audio track acquisition: synthesis followed by a duration probe.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use factreel_clients::SpeechSynthesizer;
use factreel_media::DurationProbe;
use factreel_models::{AudioTrack, PipelineFailure, Stage};

use crate::error::StageContext;

/// Produces a narration track and its duration.
#[derive(Clone)]
pub struct AudioTrackAcquirer {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    probe: Arc<dyn DurationProbe>,
}

impl AudioTrackAcquirer {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, probe: Arc<dyn DurationProbe>) -> Self {
        Self { synthesizer, probe }
    }

    /// Synthesize `text` into `out_path` and probe it.
    ///
    /// Every failure, including a track that reports no playable duration,
    /// is a [`Stage::Synthesis`] failure.
    pub async fn acquire(
        &self,
        text: &str,
        language: &str,
        out_path: &Path,
    ) -> Result<AudioTrack, PipelineFailure> {
        self.synthesizer
            .synthesize(text, language, out_path)
            .await
            .at_stage(Stage::Synthesis)?;

        let duration = self.probe.duration(out_path).await.at_stage(Stage::Synthesis)?;
        if !(duration.is_finite() && duration > 0.0) {
            return Err(PipelineFailure::synthesis(format!(
                "synthesized audio has no playable duration ({duration}s)"
            )));
        }

        debug!(duration, "Narration ready at {}", out_path.display());
        Ok(AudioTrack::new(out_path, duration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use factreel_clients::{ClientError, ClientResult};
    use factreel_media::MediaResult;

    struct WriteBytes;

    #[async_trait]
    impl SpeechSynthesizer for WriteBytes {
        async fn synthesize(&self, _text: &str, _language: &str, out: &Path) -> ClientResult<()> {
            tokio::fs::write(out, b"ID3").await?;
            Ok(())
        }
    }

    struct Refuse;

    #[async_trait]
    impl SpeechSynthesizer for Refuse {
        async fn synthesize(&self, _text: &str, language: &str, _out: &Path) -> ClientResult<()> {
            Err(ClientError::UnsupportedLanguage(language.to_string()))
        }
    }

    struct Fixed(f64);

    #[async_trait]
    impl DurationProbe for Fixed {
        async fn duration(&self, _path: &Path) -> MediaResult<f64> {
            Ok(self.0)
        }
    }

    #[tokio::test]
    async fn test_acquire_returns_probed_duration() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("voice.mp3");
        let acquirer = AudioTrackAcquirer::new(Arc::new(WriteBytes), Arc::new(Fixed(5.0)));

        let track = tokio_test::assert_ok!(acquirer.acquire("Bonjour", "fr", &out).await);
        assert_eq!(track.path, out);
        assert!((track.duration_seconds - 5.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_synthesis_error_is_synthesis_failure() {
        let dir = tempfile::tempdir().unwrap();
        let acquirer = AudioTrackAcquirer::new(Arc::new(Refuse), Arc::new(Fixed(5.0)));

        let failure = tokio_test::assert_err!(
            acquirer
                .acquire("Bonjour", "xx", &dir.path().join("voice.mp3"))
                .await
        );
        assert_eq!(failure.stage, Stage::Synthesis);
    }

    #[tokio::test]
    async fn test_zero_length_track_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let acquirer = AudioTrackAcquirer::new(Arc::new(WriteBytes), Arc::new(Fixed(0.0)));

        let failure = acquirer
            .acquire("Bonjour", "fr", &dir.path().join("voice.mp3"))
            .await
            .unwrap_err();
        assert_eq!(failure.stage, Stage::Synthesis);
        assert!(failure.message.contains("no playable duration"));
    }
}
