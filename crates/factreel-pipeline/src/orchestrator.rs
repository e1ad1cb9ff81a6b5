//! Pipeline orchestrator.
//!
//! One run turns a [`ContentRecord`] into a stored artifact:
//!
//! 1. synthesize the narration and probe its duration
//! 2. look up a background photo (optional, never fatal)
//! 3. compose the frame
//! 4. mux frame and narration
//! 5. commit the output to the [`ArtifactStore`]
//!
//! The first failing step ends the run with a [`PipelineFailure`] naming its
//! stage. Intermediate files live in a scratch directory named after the
//! run's artifact id and are removed when the run ends.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tracing::{debug, warn, Instrument};

use factreel_clients::{
    ClientResult, FactSource, GoogleTtsSynthesizer, ImageSource, Orientation, SpeechSynthesizer,
    TtsConfig,
};
use factreel_media::{DurationProbe, FfmpegMuxer, FfprobeProbe, FontBook, FrameComposer, Muxer};
use factreel_models::{
    ArtifactId, ArtifactKind, ContentRecord, PipelineFailure, PipelineResult, PipelineSuccess,
    Stage,
};
use factreel_storage::ArtifactStore;

use crate::audio::AudioTrackAcquirer;
use crate::config::{PipelineConfig, PipelineMode};
use crate::error::StageContext;
use crate::logging::RunLogger;

/// Builder for [`Pipeline`].
///
/// Only the configuration and the store are required. Every collaborator
/// left unset gets its production implementation, except the fact source and
/// the image source which stay absent.
pub struct PipelineBuilder {
    config: PipelineConfig,
    store: Arc<ArtifactStore>,
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    probe: Option<Arc<dyn DurationProbe>>,
    muxer: Option<Arc<dyn Muxer>>,
    composer: Option<Arc<FrameComposer>>,
    fact_source: Option<Arc<dyn FactSource>>,
    image_source: Option<Arc<dyn ImageSource>>,
}

impl PipelineBuilder {
    pub fn new(config: PipelineConfig, store: Arc<ArtifactStore>) -> Self {
        Self {
            config,
            store,
            synthesizer: None,
            probe: None,
            muxer: None,
            composer: None,
            fact_source: None,
            image_source: None,
        }
    }

    pub fn synthesizer(mut self, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    pub fn duration_probe(mut self, probe: Arc<dyn DurationProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn muxer(mut self, muxer: Arc<dyn Muxer>) -> Self {
        self.muxer = Some(muxer);
        self
    }

    pub fn composer(mut self, composer: FrameComposer) -> Self {
        self.composer = Some(Arc::new(composer));
        self
    }

    pub fn fact_source(mut self, source: Arc<dyn FactSource>) -> Self {
        self.fact_source = Some(source);
        self
    }

    pub fn maybe_fact_source(mut self, source: Option<Arc<dyn FactSource>>) -> Self {
        self.fact_source = source;
        self
    }

    pub fn image_source(mut self, source: Arc<dyn ImageSource>) -> Self {
        self.image_source = Some(source);
        self
    }

    pub fn maybe_image_source(mut self, source: Option<Arc<dyn ImageSource>>) -> Self {
        self.image_source = source;
        self
    }

    /// Build the pipeline. Fails only when the default synthesizer's HTTP
    /// client cannot be constructed.
    pub fn build(self) -> ClientResult<Pipeline> {
        let synthesizer: Arc<dyn SpeechSynthesizer> = match self.synthesizer {
            Some(s) => s,
            None => Arc::new(GoogleTtsSynthesizer::new(TtsConfig::default())?),
        };
        let probe = self
            .probe
            .unwrap_or_else(|| Arc::new(FfprobeProbe) as Arc<dyn DurationProbe>);
        let muxer = self.muxer.unwrap_or_else(|| {
            Arc::new(
                FfmpegMuxer::new(self.config.encoding.clone())
                    .with_timeout(self.config.mux_timeout_secs),
            ) as Arc<dyn Muxer>
        });
        let composer = self
            .composer
            .unwrap_or_else(|| Arc::new(FrameComposer::new(FontBook::load(&self.config.fonts))));

        Ok(Pipeline {
            permits: Arc::new(Semaphore::new(self.config.max_concurrent_runs.max(1))),
            audio: AudioTrackAcquirer::new(synthesizer, probe),
            config: self.config,
            store: self.store,
            muxer,
            composer,
            fact_source: self.fact_source,
            image_source: self.image_source,
        })
    }
}

/// Fact-to-video pipeline. Cheap to share behind an `Arc`; runs never share
/// state beyond the artifact store.
pub struct Pipeline {
    config: PipelineConfig,
    store: Arc<ArtifactStore>,
    audio: AudioTrackAcquirer,
    muxer: Arc<dyn Muxer>,
    composer: Arc<FrameComposer>,
    fact_source: Option<Arc<dyn FactSource>>,
    image_source: Option<Arc<dyn ImageSource>>,
    permits: Arc<Semaphore>,
}

impl Pipeline {
    pub fn builder(config: PipelineConfig, store: Arc<ArtifactStore>) -> PipelineBuilder {
        PipelineBuilder::new(config, store)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<ArtifactStore> {
        &self.store
    }

    /// Whether [`Pipeline::run_auto`] can fetch content.
    pub fn has_fact_source(&self) -> bool {
        self.fact_source.is_some()
    }

    /// Run the configured mode for `record`.
    pub async fn run(&self, record: ContentRecord) -> PipelineResult {
        match self.config.mode {
            PipelineMode::Video => self.run_video(record).await,
            PipelineMode::AudioOnly => self.run_audio_only(record).await,
        }
    }

    /// Fetch a fact from the configured source, then run it.
    pub async fn run_auto(&self) -> PipelineResult {
        let Some(source) = &self.fact_source else {
            return Err(PipelineFailure::content_fetch("no fact source configured"));
        };

        let record = source.fetch_fact().await.at_stage(Stage::ContentFetch)?;
        record
            .validate()
            .map_err(|e| PipelineFailure::content_fetch(format!("{} returned {e}", source.name())))?;
        debug!(source = source.name(), title = %record.title, "Fact fetched");

        self.run(record).await
    }

    /// Full run: narration, frame, mux, store as [`ArtifactKind::Video`].
    pub async fn run_video(&self, record: ContentRecord) -> PipelineResult {
        self.execute(record, PipelineMode::Video).await
    }

    /// Degraded run: narration only, stored as [`ArtifactKind::AudioOnly`].
    pub async fn run_audio_only(&self, record: ContentRecord) -> PipelineResult {
        self.execute(record, PipelineMode::AudioOnly).await
    }

    async fn execute(&self, record: ContentRecord, mode: PipelineMode) -> PipelineResult {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| PipelineFailure::storage(format!("pipeline closed: {e}")))?;

        let started = Instant::now();
        let (id, run_dir) = self.reserve_run().await?;
        let logger = RunLogger::new(&id, mode_label(mode));

        let result = async {
            logger.log_start(&record.title);
            let result = match mode {
                PipelineMode::Video => self.video_steps(&id, &run_dir, &record, &logger).await,
                PipelineMode::AudioOnly => self.audio_steps(&id, &run_dir, &record, &logger).await,
            };
            match &result {
                Ok(success) => logger.log_completion(&success.artifact.path.display().to_string()),
                Err(failure) => logger.log_error(failure),
            }
            result
        }
        .instrument(logger.create_span())
        .await;

        if let Err(e) = tokio::fs::remove_dir_all(&run_dir).await {
            warn!(run_id = %id, "Failed to remove scratch dir {}: {}", run_dir.display(), e);
        }

        record_run_metrics(mode, &result, started);
        result
    }

    /// Reserve a fresh artifact id by creating its scratch directory.
    async fn reserve_run(&self) -> Result<(ArtifactId, PathBuf), PipelineFailure> {
        loop {
            let id = self.store.new_id().await.at_stage(Stage::Storage)?;
            let run_dir = self.store.run_dir(&id);
            match tokio::fs::create_dir(&run_dir).await {
                Ok(()) => return Ok((id, run_dir)),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(PipelineFailure::storage(format!(
                        "cannot create scratch dir {}: {e}",
                        run_dir.display()
                    )))
                }
            }
        }
    }

    async fn audio_steps(
        &self,
        id: &ArtifactId,
        run_dir: &Path,
        record: &ContentRecord,
        logger: &RunLogger,
    ) -> PipelineResult {
        logger.log_progress(Stage::Synthesis, "synthesizing narration");
        let voice = run_dir.join(format!("voice_{id}.mp3"));
        let track = self
            .audio
            .acquire(&record.narration_text(), &self.config.language, &voice)
            .await?;

        logger.log_progress(Stage::Storage, "storing narration");
        let artifact = self
            .store
            .put_file_as(id, &track.path, ArtifactKind::AudioOnly)
            .await
            .at_stage(Stage::Storage)?;

        Ok(PipelineSuccess {
            artifact,
            record: record.clone(),
        })
    }

    async fn video_steps(
        &self,
        id: &ArtifactId,
        run_dir: &Path,
        record: &ContentRecord,
        logger: &RunLogger,
    ) -> PipelineResult {
        logger.log_progress(Stage::Synthesis, "synthesizing narration");
        let voice = run_dir.join(format!("voice_{id}.mp3"));
        let track = self
            .audio
            .acquire(&record.narration_text(), &self.config.language, &voice)
            .await?;

        let background = self.fetch_background(record, logger).await;

        logger.log_progress(Stage::Composition, "composing frame");
        let frame = run_dir.join(format!("frame_{id}.png"));
        {
            let composer = Arc::clone(&self.composer);
            let record = record.clone();
            let frame = frame.clone();
            tokio::task::spawn_blocking(move || {
                composer.compose_to_file(&record, background.as_deref(), &frame)
            })
            .await
            .at_stage(Stage::Composition)?
            .at_stage(Stage::Composition)?;
        }

        logger.log_progress(Stage::Muxing, "muxing frame and narration");
        let video = run_dir.join(format!("video_{id}.mp4"));
        self.muxer
            .mux(&frame, &track, &video)
            .await
            .at_stage(Stage::Muxing)?;

        logger.log_progress(Stage::Storage, "storing video");
        let artifact = self
            .store
            .put_file_as(id, &video, ArtifactKind::Video)
            .await
            .at_stage(Stage::Storage)?;

        Ok(PipelineSuccess {
            artifact,
            record: record.clone(),
        })
    }

    /// Background photo bytes, or `None` for the plain canvas.
    async fn fetch_background(&self, record: &ContentRecord, logger: &RunLogger) -> Option<Vec<u8>> {
        let source = self.image_source.as_ref()?;
        let keyword = record.image_keyword()?;

        match source.find_image(keyword, Orientation::Portrait).await {
            Ok(Some(bytes)) => Some(bytes),
            Ok(None) => {
                debug!(run_id = logger.run_id(), keyword, "No background photo found");
                None
            }
            Err(e) => {
                logger.log_warning("image_fetch", &format!("falling back to plain canvas: {e}"));
                None
            }
        }
    }
}

fn mode_label(mode: PipelineMode) -> &'static str {
    match mode {
        PipelineMode::Video => "video",
        PipelineMode::AudioOnly => "audio_only",
    }
}

fn record_run_metrics(mode: PipelineMode, result: &PipelineResult, started: Instant) {
    let (outcome, stage) = match result {
        Ok(_) => ("success", "none"),
        Err(failure) => ("failure", failure.stage.as_str()),
    };
    metrics::counter!(
        "factreel_runs_total",
        "outcome" => outcome,
        "stage" => stage,
        "mode" => mode_label(mode)
    )
    .increment(1);
    metrics::histogram!("factreel_run_duration_seconds", "mode" => mode_label(mode))
        .record(started.elapsed().as_secs_f64());
}
