//! Gemini fact source.
//!
//! Calls the `generateContent` endpoint once per fact. No retries and no
//! model fallback: a failed call fails the run.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use factreel_models::ContentRecord;

use crate::error::{ClientError, ClientResult};
use crate::fact::{parse_fact_text, FactSource, FACT_PROMPT};
use crate::http::{build_client, timeout_from_env};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Gemini client configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            timeout: Duration::from_secs(crate::http::DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> ClientResult<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ClientError::config("GEMINI_API_KEY not configured"))?;

        Ok(Self {
            api_key,
            base_url: std::env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_BASE_URL.to_string()),
            model: std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string()),
            timeout: timeout_from_env("GEMINI_TIMEOUT_SECS"),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Gemini API request.
#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

/// Gemini API response.
#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// [`FactSource`] backed by Google Gemini.
pub struct GeminiFactSource {
    config: GeminiConfig,
    client: Client,
}

impl GeminiFactSource {
    pub fn new(config: GeminiConfig) -> ClientResult<Self> {
        let client = build_client(config.timeout)?;
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl FactSource for GeminiFactSource {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn fetch_fact(&self) -> ClientResult<ContentRecord> {
        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: FACT_PROMPT.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.9,
                max_output_tokens: 300,
            },
        };

        info!(model = %self.config.model, "Requesting fact from Gemini");
        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.config.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::from_response(response).await);
        }

        let body: GeminiResponse = response
            .json()
            .await
            .map_err(|e| ClientError::invalid_response(format!("Gemini body: {e}")))?;

        let text = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .ok_or_else(|| ClientError::MissingField("candidates[0].content.parts[0].text".into()))?;

        debug!("Gemini raw fact: {}", text);
        parse_fact_text(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn answer(text: &str) -> serde_json::Value {
        json!({"candidates": [{"content": {"parts": [{"text": text}]}}]})
    }

    async fn source(server: &MockServer) -> GeminiFactSource {
        GeminiFactSource::new(GeminiConfig::new("test-key").with_base_url(server.uri())).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_fact_strips_fences() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
            .and(query_param("key", "test-key"))
            .and(body_partial_json(json!({"generationConfig": {"maxOutputTokens": 300}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(answer(
                "```json\n{\"titre\": \"Les pieuvres ont trois cœurs\", \"fait\": \"Deux cœurs irriguent les branchies.\", \"hashtags\": \"#fait\", \"mot_cle_image\": \"octopus\"}\n```",
            )))
            .expect(1)
            .mount(&server)
            .await;

        let record = source(&server).await.fetch_fact().await.unwrap();
        assert_eq!(record.title, "Les pieuvres ont trois cœurs");
        assert_eq!(record.image_keyword(), Some("octopus"));
    }

    #[tokio::test]
    async fn test_fetch_fact_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let err = source(&server).await.fetch_fact().await.unwrap_err();
        assert!(matches!(err, ClientError::Status { status: 429, .. }));
    }

    #[tokio::test]
    async fn test_fetch_fact_without_candidates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"promptFeedback": {}})))
            .mount(&server)
            .await;

        let err = source(&server).await.fetch_fact().await.unwrap_err();
        assert!(matches!(err, ClientError::MissingField(_)));
    }

    #[tokio::test]
    async fn test_fetch_fact_prose_answer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(answer("Bien sûr ! Voici un fait.")))
            .mount(&server)
            .await;

        let err = source(&server).await.fetch_fact().await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidResponse(_)));
    }
}
