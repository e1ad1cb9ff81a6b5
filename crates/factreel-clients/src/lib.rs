//! Clients for the pipeline's external collaborators.
//!
//! This crate provides:
//! - Fact generation via Gemini or Groq, with tolerant response parsing
//! - Speech synthesis via the Google Translate TTS endpoint
//! - Stock image lookup via Unsplash

pub mod error;
pub mod fact;
pub mod gemini;
pub mod groq;
pub mod http;
pub mod tts;
pub mod unsplash;

pub use error::{ClientError, ClientResult};
pub use fact::{parse_fact_text, FactSource, FACT_PROMPT};
pub use gemini::{GeminiConfig, GeminiFactSource};
pub use groq::{GroqConfig, GroqFactSource};
pub use tts::{GoogleTtsSynthesizer, SpeechSynthesizer, TtsConfig};
pub use unsplash::{ImageSource, Orientation, UnsplashConfig, UnsplashImageSource};
