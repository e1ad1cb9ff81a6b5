//! Application state.

use std::sync::Arc;

use tracing::info;

use factreel_clients::{
    FactSource, GeminiConfig, GeminiFactSource, GoogleTtsSynthesizer, GroqConfig, GroqFactSource,
    ImageSource, TtsConfig, UnsplashConfig, UnsplashImageSource,
};
use factreel_pipeline::{Pipeline, PipelineConfig};
use factreel_storage::ArtifactStore;

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pipeline: Arc<Pipeline>,
    pub store: Arc<ArtifactStore>,
}

impl AppState {
    /// Wrap an already-built pipeline.
    pub fn new(config: ApiConfig, pipeline: Arc<Pipeline>) -> Self {
        let store = Arc::clone(pipeline.store());
        Self {
            config,
            pipeline,
            store,
        }
    }

    /// Build the production pipeline from environment configuration.
    ///
    /// Gemini is preferred as fact source, Groq is used when only its key is
    /// set. Without either, `/generate-auto` reports the missing key.
    pub async fn from_env(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let pipeline_config = PipelineConfig::from_env();
        let store = Arc::new(ArtifactStore::open(&pipeline_config.work_dir).await?);

        let fact_source: Option<Arc<dyn FactSource>> = if let Ok(gemini) = GeminiConfig::from_env() {
            Some(Arc::new(GeminiFactSource::new(gemini)?))
        } else if let Ok(groq) = GroqConfig::from_env() {
            Some(Arc::new(GroqFactSource::new(groq)?))
        } else {
            None
        };
        let image_source: Option<Arc<dyn ImageSource>> = match UnsplashConfig::from_env() {
            Ok(unsplash) => Some(Arc::new(UnsplashImageSource::new(unsplash)?)),
            Err(_) => None,
        };

        info!(
            fact_source = fact_source.as_ref().map(|s| s.name()).unwrap_or("none"),
            image_source = image_source.is_some(),
            work_dir = %pipeline_config.work_dir.display(),
            "Pipeline collaborators configured"
        );

        let pipeline = Pipeline::builder(pipeline_config, store)
            .synthesizer(Arc::new(GoogleTtsSynthesizer::new(TtsConfig::from_env())?))
            .maybe_fact_source(fact_source)
            .maybe_image_source(image_source)
            .build()?;

        Ok(Self::new(config, Arc::new(pipeline)))
    }
}
