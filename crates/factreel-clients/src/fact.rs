//! Fact generation contract and response parsing.

use async_trait::async_trait;
use serde_json::Value;

use factreel_models::{ContentRecord, ContentRecordError};

use crate::error::{ClientError, ClientResult};

/// Prompt asking for one surprising fact as bare JSON.
pub const FACT_PROMPT: &str = r##"Génère un fait insolite surprenant en français.
Réponds UNIQUEMENT avec un JSON valide, sans markdown, sans commentaire.
Format exact :
{
  "titre": "Titre accrocheur max 8 mots",
  "fait": "Description du fait insolite en 50-60 mots maximum.",
  "hashtags": "#fait #insolite #science #culture #saviez",
  "mot_cle_image": "un mot-clé en anglais pour illustrer le fait"
}"##;

/// Produces content records from a text-generation service.
#[async_trait]
pub trait FactSource: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &'static str;

    async fn fetch_fact(&self) -> ClientResult<ContentRecord>;
}

/// Parse a model's text answer into a content record.
///
/// Code-fence markup is stripped first. Anything else around the JSON object
/// (explanatory prose, a second object) is rejected.
pub fn parse_fact_text(text: &str) -> ClientResult<ContentRecord> {
    let cleaned = strip_code_fences(text);
    if cleaned.is_empty() {
        return Err(ClientError::invalid_response("empty fact response"));
    }

    let value: Value = serde_json::from_str(cleaned)
        .map_err(|e| ClientError::invalid_response(format!("fact is not valid JSON: {e}")))?;

    let Value::Object(map) = value else {
        return Err(ClientError::invalid_response("fact JSON is not an object"));
    };

    ContentRecord::from_map(&map).map_err(|e| match e {
        ContentRecordError::MissingField(field) => ClientError::MissingField(field),
        other => ClientError::invalid_response(other.to_string()),
    })
}

/// Remove a surrounding ```json ... ``` fence, if any.
fn strip_code_fences(text: &str) -> &str {
    let mut text = text.trim();
    if let Some(rest) = text.strip_prefix("```") {
        // Drop the info string ("json", "JSON", ...) up to the first newline.
        text = match rest.find('\n') {
            Some(pos) if !rest[..pos].contains('{') => &rest[pos + 1..],
            _ => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
        };
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FACT: &str = r##"{"titre": "Le miel ne périme jamais", "fait": "Des pots de miel de 3000 ans sont encore comestibles.", "hashtags": "#fait #insolite"}"##;

    #[test]
    fn test_parse_bare_json() {
        let record = parse_fact_text(FACT).unwrap();
        assert_eq!(record.title, "Le miel ne périme jamais");
        assert_eq!(record.hashtags, "#fait #insolite");
        assert!(record.image_keyword.is_none());
    }

    #[test]
    fn test_parse_fenced_json() {
        let fenced = format!("```json\n{FACT}\n```");
        assert_eq!(parse_fact_text(&fenced).unwrap(), parse_fact_text(FACT).unwrap());

        let same_line = format!("```json{FACT}```");
        assert!(parse_fact_text(&same_line).is_ok());

        let bare_fence = format!("```\n{FACT}\n```\n");
        assert!(parse_fact_text(&bare_fence).is_ok());
    }

    #[test]
    fn test_prose_around_json_is_rejected() {
        let chatty = format!("Voici un fait insolite :\n```json\n{FACT}\n```\nBonne lecture !");
        assert!(matches!(
            parse_fact_text(&chatty),
            Err(ClientError::InvalidResponse(_))
        ));
        assert!(parse_fact_text("Je ne peux pas répondre.").is_err());
        assert!(parse_fact_text("").is_err());
    }

    #[test]
    fn test_missing_field_is_reported() {
        let err = parse_fact_text(r##"{"titre": "x", "fait": "y"}"##).unwrap_err();
        assert!(matches!(err, ClientError::MissingField(ref f) if f == "hashtags"));
    }

    #[test]
    fn test_non_object_is_rejected() {
        assert!(matches!(
            parse_fact_text("[1, 2, 3]"),
            Err(ClientError::InvalidResponse(_))
        ));
    }
}
