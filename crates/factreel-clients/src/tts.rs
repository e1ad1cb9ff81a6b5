//! Speech synthesis.
//!
//! The Google Translate TTS endpoint accepts at most 100 characters per
//! request, so narration is split at word boundaries and the returned MP3
//! segments are concatenated into one file.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{ClientError, ClientResult};
use crate::http::{build_client, timeout_from_env, DEFAULT_TIMEOUT_SECS};

pub const DEFAULT_TTS_BASE_URL: &str = "https://translate.google.com";
/// Maximum characters per synthesis request.
pub const MAX_CHUNK_CHARS: usize = 100;

/// Language codes the endpoint is known to voice.
pub const SUPPORTED_LANGUAGES: &[&str] = &[
    "af", "ar", "bg", "bn", "bs", "ca", "cs", "cy", "da", "de", "el", "en", "es", "et", "fi",
    "fr", "gu", "hi", "hr", "hu", "id", "is", "it", "iw", "ja", "jw", "km", "kn", "ko", "la",
    "lv", "ml", "mr", "ms", "my", "ne", "nl", "no", "pl", "pt", "ro", "ru", "si", "sk", "sq",
    "sr", "su", "sv", "sw", "ta", "te", "th", "tl", "tr", "uk", "ur", "vi", "zh-CN", "zh-TW",
];

/// Turns text into an audio file.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` in `language` and write the audio to `out_path`.
    async fn synthesize(&self, text: &str, language: &str, out_path: &Path) -> ClientResult<()>;
}

/// TTS client configuration.
#[derive(Debug, Clone)]
pub struct TtsConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_TTS_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl TtsConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("TTS_BASE_URL").unwrap_or_else(|_| DEFAULT_TTS_BASE_URL.to_string()),
            timeout: timeout_from_env("TTS_TIMEOUT_SECS"),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// [`SpeechSynthesizer`] using the Google Translate TTS endpoint.
pub struct GoogleTtsSynthesizer {
    config: TtsConfig,
    client: Client,
}

impl GoogleTtsSynthesizer {
    pub fn new(config: TtsConfig) -> ClientResult<Self> {
        let client = build_client(config.timeout)?;
        Ok(Self { config, client })
    }

    async fn fetch_chunk(
        &self,
        chunk: &str,
        language: &str,
        idx: usize,
        total: usize,
    ) -> ClientResult<Vec<u8>> {
        let total = total.to_string();
        let idx = idx.to_string();
        let textlen = chunk.chars().count().to_string();

        let response = self
            .client
            .get(format!("{}/translate_tts", self.config.base_url.trim_end_matches('/')))
            .query(&[
                ("ie", "UTF-8"),
                ("q", chunk),
                ("tl", language),
                ("client", "tw-ob"),
                ("ttsspeed", "1"),
                ("total", total.as_str()),
                ("idx", idx.as_str()),
                ("textlen", textlen.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::from_response(response).await);
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(ClientError::invalid_response("TTS returned an empty segment"));
        }
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTtsSynthesizer {
    async fn synthesize(&self, text: &str, language: &str, out_path: &Path) -> ClientResult<()> {
        if !SUPPORTED_LANGUAGES.contains(&language) {
            return Err(ClientError::UnsupportedLanguage(language.to_string()));
        }
        let chunks = split_chunks(text, MAX_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err(ClientError::EmptyText);
        }

        info!(language, chunks = chunks.len(), "Synthesizing narration");

        let mut audio = Vec::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            debug!(idx, "TTS chunk: {}", chunk);
            audio.extend(self.fetch_chunk(chunk, language, idx, chunks.len()).await?);
        }

        let mut file = tokio::fs::File::create(out_path).await?;
        file.write_all(&audio).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Split `text` into chunks of at most `max` characters at word boundaries.
///
/// Words longer than `max` are cut. Blank input yields no chunks.
pub fn split_chunks(text: &str, max: usize) -> Vec<String> {
    let max = max.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();

        while word.len() > max {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(max);
            chunks.push(word.into_iter().collect());
            word = rest;
        }

        let word_len = word.len();
        if current.is_empty() {
            current.extend(word);
            current_len = word_len;
        } else if current_len + 1 + word_len <= max {
            current.push(' ');
            current.extend(word);
            current_len += 1 + word_len;
        } else {
            chunks.push(std::mem::take(&mut current));
            current.extend(word);
            current_len = word_len;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_split_chunks_limits() {
        let text = "Le miel est le seul aliment qui ne se périme jamais. ".repeat(6);
        let chunks = split_chunks(&text, MAX_CHUNK_CHARS);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= MAX_CHUNK_CHARS));
        assert_eq!(chunks.join(" "), text.split_whitespace().collect::<Vec<_>>().join(" "));
    }

    #[test]
    fn test_split_chunks_cuts_long_words() {
        let chunks = split_chunks("ab abcdefgh c", 3);
        assert_eq!(chunks, vec!["ab", "abc", "def", "gh", "c"]);
        assert!(chunks.iter().all(|c| c.chars().count() <= 3));
        assert!(split_chunks("  \n ", 100).is_empty());
    }

    #[tokio::test]
    async fn test_rejects_before_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;

        let tts = GoogleTtsSynthesizer::new(TtsConfig::default().with_base_url(server.uri())).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("voice.mp3");

        assert!(matches!(tts.synthesize("   ", "fr", &out).await, Err(ClientError::EmptyText)));
        assert!(matches!(
            tts.synthesize("Bonjour", "xx", &out).await,
            Err(ClientError::UnsupportedLanguage(_))
        ));
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn test_segments_are_concatenated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/translate_tts"))
            .and(query_param("tl", "fr"))
            .and(query_param("idx", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"AAA".to_vec()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/translate_tts"))
            .and(query_param("idx", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"BBB".to_vec()))
            .mount(&server)
            .await;

        let tts = GoogleTtsSynthesizer::new(TtsConfig::default().with_base_url(server.uri())).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("voice.mp3");
        let text = format!("{} {}", "a".repeat(60), "b".repeat(60));

        tts.synthesize(&text, "fr", &out).await.unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), b"AAABBB");
    }

    #[tokio::test]
    async fn test_upstream_failure_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let tts = GoogleTtsSynthesizer::new(TtsConfig::default().with_base_url(server.uri())).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let err = tts
            .synthesize("Bonjour", "fr", &dir.path().join("voice.mp3"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Status { status: 503, .. }));
    }
}
