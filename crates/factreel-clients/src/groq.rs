//! Groq fact source (OpenAI-compatible chat completions).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use factreel_models::ContentRecord;

use crate::error::{ClientError, ClientResult};
use crate::fact::{parse_fact_text, FactSource, FACT_PROMPT};
use crate::http::{build_client, timeout_from_env, DEFAULT_TIMEOUT_SECS};

pub const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";

/// Groq client configuration.
#[derive(Debug, Clone)]
pub struct GroqConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl GroqConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_GROQ_BASE_URL.to_string(),
            model: DEFAULT_GROQ_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> ClientResult<Self> {
        let api_key = std::env::var("GROQ_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ClientError::config("GROQ_API_KEY not configured"))?;

        Ok(Self {
            api_key,
            base_url: std::env::var("GROQ_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_GROQ_BASE_URL.to_string()),
            model: std::env::var("GROQ_MODEL").unwrap_or_else(|_| DEFAULT_GROQ_MODEL.to_string()),
            timeout: timeout_from_env("GROQ_TIMEOUT_SECS"),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// [`FactSource`] backed by Groq.
pub struct GroqFactSource {
    config: GroqConfig,
    client: Client,
}

impl GroqFactSource {
    pub fn new(config: GroqConfig) -> ClientResult<Self> {
        let client = build_client(config.timeout)?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl FactSource for GroqFactSource {
    fn name(&self) -> &'static str {
        "groq"
    }

    async fn fetch_fact(&self) -> ClientResult<ContentRecord> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: FACT_PROMPT,
            }],
            temperature: 0.9,
            max_tokens: 300,
        };

        info!(model = %self.config.model, "Requesting fact from Groq");
        let response = self
            .client
            .post(format!(
                "{}/chat/completions",
                self.config.base_url.trim_end_matches('/')
            ))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::from_response(response).await);
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ClientError::invalid_response(format!("Groq body: {e}")))?;

        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ClientError::MissingField("choices[0].message.content".into()))?;

        debug!("Groq raw fact: {}", text);
        parse_fact_text(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_fact() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer groq-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content":
                    "{\"titre\": \"Les bananes sont radioactives\", \"fait\": \"Elles contiennent du potassium 40.\", \"hashtags\": \"#science\"}"
                }}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let source = GroqFactSource::new(GroqConfig::new("groq-key").with_base_url(server.uri())).unwrap();
        let record = source.fetch_fact().await.unwrap();
        assert_eq!(record.title, "Les bananes sont radioactives");
        assert_eq!(source.name(), "groq");
    }

    #[tokio::test]
    async fn test_empty_choices() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let source = GroqFactSource::new(GroqConfig::new("k").with_base_url(server.uri())).unwrap();
        assert!(matches!(
            source.fetch_fact().await.unwrap_err(),
            ClientError::MissingField(_)
        ));
    }
}
