//! Stock image lookup via Unsplash.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{ClientError, ClientResult};
use crate::http::{build_client, timeout_from_env, DEFAULT_TIMEOUT_SECS};

pub const DEFAULT_UNSPLASH_BASE_URL: &str = "https://api.unsplash.com";

/// Requested photo orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
    Squarish,
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Portrait => "portrait",
            Orientation::Landscape => "landscape",
            Orientation::Squarish => "squarish",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Finds a photo for a keyword.
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Image bytes for `keyword`, or `None` when nothing matches.
    async fn find_image(&self, keyword: &str, orientation: Orientation) -> ClientResult<Option<Vec<u8>>>;
}

/// Unsplash client configuration.
#[derive(Debug, Clone)]
pub struct UnsplashConfig {
    pub access_key: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl UnsplashConfig {
    pub fn new(access_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            base_url: DEFAULT_UNSPLASH_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> ClientResult<Self> {
        let access_key = std::env::var("UNSPLASH_ACCESS_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ClientError::config("UNSPLASH_ACCESS_KEY not configured"))?;

        Ok(Self {
            access_key,
            base_url: std::env::var("UNSPLASH_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_UNSPLASH_BASE_URL.to_string()),
            timeout: timeout_from_env("UNSPLASH_TIMEOUT_SECS"),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    urls: PhotoUrls,
}

#[derive(Debug, Deserialize)]
struct PhotoUrls {
    regular: String,
}

/// [`ImageSource`] backed by the Unsplash search API.
pub struct UnsplashImageSource {
    config: UnsplashConfig,
    client: Client,
}

impl UnsplashImageSource {
    pub fn new(config: UnsplashConfig) -> ClientResult<Self> {
        let client = build_client(config.timeout)?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl ImageSource for UnsplashImageSource {
    async fn find_image(&self, keyword: &str, orientation: Orientation) -> ClientResult<Option<Vec<u8>>> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Ok(None);
        }

        let response = self
            .client
            .get(format!(
                "{}/search/photos",
                self.config.base_url.trim_end_matches('/')
            ))
            .header("Authorization", format!("Client-ID {}", self.config.access_key))
            .header("Accept-Version", "v1")
            .query(&[
                ("query", keyword),
                ("orientation", orientation.as_str()),
                ("per_page", "1"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::from_response(response).await);
        }

        let search: SearchResponse = response
            .json()
            .await
            .map_err(|e| ClientError::invalid_response(format!("Unsplash body: {e}")))?;

        let Some(photo) = search.results.into_iter().next() else {
            debug!(keyword, "No Unsplash result");
            return Ok(None);
        };

        let image = self.client.get(&photo.urls.regular).send().await?;
        if !image.status().is_success() {
            return Err(ClientError::from_response(image).await);
        }
        let bytes = image.bytes().await?;
        info!(keyword, bytes = bytes.len(), "Fetched background photo");
        Ok(Some(bytes.to_vec()))
    }
}
