//! Content records: the structured "fact" driving a single video.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Boundary key for the title.
pub const KEY_TITLE: &str = "titre";
/// Boundary key for the optional lead sentence.
pub const KEY_INTRO: &str = "intro";
/// Boundary key for the narrated body.
pub const KEY_BODY: &str = "fait";
/// Boundary key for the optional closing sentence.
pub const KEY_CONCLUSION: &str = "conclusion";
/// Boundary key for the hashtag line.
pub const KEY_HASHTAGS: &str = "hashtags";
/// Boundary key for the optional background image keyword.
pub const KEY_IMAGE_KEYWORD: &str = "mot_cle_image";

/// Keys a caller must always provide.
pub const REQUIRED_KEYS: [&str; 3] = [KEY_TITLE, KEY_BODY, KEY_HASHTAGS];

/// Errors raised while reading a content record from the input boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContentRecordError {
    #[error("Champ manquant : {0}")]
    MissingField(String),

    #[error("Champ invalide : {field} ({reason})")]
    InvalidField { field: String, reason: String },

    #[error("Le champ 'fait' ne peut pas être vide")]
    EmptyBody,
}

/// A short structured fact.
///
/// Produced externally and immutable once received. `body` is the narration
/// source; `title` and `hashtags` are only rendered on screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ContentRecord {
    #[serde(rename = "titre", alias = "title")]
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intro: Option<String>,

    #[serde(rename = "fait", alias = "body")]
    pub body: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<String>,

    pub hashtags: String,

    #[serde(
        rename = "mot_cle_image",
        alias = "image_keyword",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub image_keyword: Option<String>,
}

impl ContentRecord {
    /// Create a record with only the required fields.
    pub fn new(
        title: impl Into<String>,
        body: impl Into<String>,
        hashtags: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            intro: None,
            body: body.into(),
            conclusion: None,
            hashtags: hashtags.into(),
            image_keyword: None,
        }
    }

    pub fn with_intro(mut self, intro: impl Into<String>) -> Self {
        self.intro = Some(intro.into());
        self
    }

    pub fn with_conclusion(mut self, conclusion: impl Into<String>) -> Self {
        self.conclusion = Some(conclusion.into());
        self
    }

    pub fn with_image_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.image_keyword = Some(keyword.into());
        self
    }

    /// Build a record from a boundary mapping.
    ///
    /// Missing required keys are reported by name so the boundary can answer
    /// with a caller error. Blank optional fields are treated as absent.
    pub fn from_map(map: &Map<String, Value>) -> Result<Self, ContentRecordError> {
        for key in REQUIRED_KEYS {
            if !map.contains_key(key) {
                return Err(ContentRecordError::MissingField(key.to_string()));
            }
        }

        let record = Self {
            title: required_str(map, KEY_TITLE)?,
            intro: optional_str(map, KEY_INTRO)?,
            body: required_str(map, KEY_BODY)?,
            conclusion: optional_str(map, KEY_CONCLUSION)?,
            hashtags: required_str(map, KEY_HASHTAGS)?,
            image_keyword: optional_str(map, KEY_IMAGE_KEYWORD)?,
        };
        record.validate()?;
        Ok(record)
    }

    /// Check the record invariants.
    pub fn validate(&self) -> Result<(), ContentRecordError> {
        if self.body.trim().is_empty() {
            return Err(ContentRecordError::EmptyBody);
        }
        Ok(())
    }

    /// Text handed to speech synthesis.
    ///
    /// Intro, body and conclusion are joined only when all three are present;
    /// otherwise the body is narrated alone.
    pub fn narration_text(&self) -> String {
        match (non_blank(&self.intro), non_blank(&self.conclusion)) {
            (Some(intro), Some(conclusion)) => {
                format!("{} {} {}", intro.trim(), self.body.trim(), conclusion.trim())
            }
            _ => self.body.trim().to_string(),
        }
    }

    /// Image keyword, if one was supplied and is not blank.
    pub fn image_keyword(&self) -> Option<&str> {
        non_blank(&self.image_keyword)
    }

    /// Lead sentence, if one was supplied and is not blank.
    pub fn intro(&self) -> Option<&str> {
        non_blank(&self.intro)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

fn required_str(map: &Map<String, Value>, key: &str) -> Result<String, ContentRecordError> {
    match map.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(ContentRecordError::InvalidField {
            field: key.to_string(),
            reason: format!("expected a string, got {}", json_type(other)),
        }),
        None => Err(ContentRecordError::MissingField(key.to_string())),
    }
}

fn optional_str(map: &Map<String, Value>, key: &str) -> Result<Option<String>, ContentRecordError> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(ContentRecordError::InvalidField {
            field: key.to_string(),
            reason: format!("expected a string, got {}", json_type(other)),
        }),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
