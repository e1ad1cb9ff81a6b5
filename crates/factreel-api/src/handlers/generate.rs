//! Video generation handlers.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use factreel_models::{ArtifactId, ContentRecord};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Serialize)]
pub struct GenerateResponse {
    pub success: bool,
    pub video_url: String,
    pub video_id: String,
    pub titre: String,
}

#[derive(Serialize)]
pub struct GenerateAutoResponse {
    pub success: bool,
    pub video_url: String,
    pub video_id: String,
    pub fact: ContentRecord,
}

/// Generate a video from a caller-supplied content record.
pub async fn generate(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<GenerateResponse>> {
    let record = parse_record(&body)?;
    info!(title = %record.title, "Generating video");

    let success = state.pipeline.run(record).await?;

    Ok(Json(GenerateResponse {
        success: true,
        video_url: download_url(&state, &headers, success.artifact_id()),
        video_id: success.artifact_id().to_string(),
        titre: success.record.title,
    }))
}

/// Fetch a fact from the configured source, then generate its video.
pub async fn generate_auto(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<GenerateAutoResponse>> {
    if !state.pipeline.has_fact_source() {
        return Err(ApiError::not_configured("GEMINI_API_KEY not configured"));
    }

    let success = state.pipeline.run_auto().await?;

    Ok(Json(GenerateAutoResponse {
        success: true,
        video_url: download_url(&state, &headers, success.artifact_id()),
        video_id: success.artifact_id().to_string(),
        fact: success.record,
    }))
}

/// Boundary validation: a JSON object carrying every required key.
fn parse_record(body: &[u8]) -> ApiResult<ContentRecord> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|_| ApiError::bad_request("Body JSON manquant"))?;
    let Value::Object(map) = value else {
        return Err(ApiError::bad_request("Body JSON manquant"));
    };

    ContentRecord::from_map(&map).map_err(|e| ApiError::bad_request(e.to_string()))
}

fn download_url(state: &AppState, headers: &HeaderMap, id: &ArtifactId) -> String {
    format!("{}/download/{}", base_url(state, headers), id)
}

/// Public base URL, honouring a reverse proxy's forwarded scheme.
fn base_url(state: &AppState, headers: &HeaderMap) -> String {
    if let Some(base) = &state.config.public_base_url {
        return base.clone();
    }

    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    let scheme = headers
        .get("X-Forwarded-Proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .unwrap_or("http");

    format!("{scheme}://{host}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_record_requires_object() {
        let err = parse_record(b"not json").unwrap_err();
        assert_eq!(err.to_string(), "Body JSON manquant");

        let err = parse_record(b"[1, 2]").unwrap_err();
        assert_eq!(err.to_string(), "Body JSON manquant");
    }

    #[test]
    fn test_parse_record_names_missing_field() {
        let err = parse_record(br##"{"titre": "Le miel", "hashtags": "#fait"}"##).unwrap_err();
        assert_eq!(err.to_string(), "Champ manquant : fait");
    }

    #[test]
    fn test_parse_record_accepts_optional_fields() {
        let record = parse_record(
            r##"{"titre": "Le miel", "fait": "Il ne périme jamais.", "hashtags": "#fait", "intro": "Saviez-vous"}"##
                .as_bytes(),
        )
        .unwrap();
        assert_eq!(record.intro(), Some("Saviez-vous"));
    }
}
