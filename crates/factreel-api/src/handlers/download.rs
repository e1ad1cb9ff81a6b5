//! Artifact download handler.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::Response;

use factreel_models::ArtifactId;
use factreel_storage::Lookup;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const NOT_FOUND_MESSAGE: &str = "Vidéo non trouvée ou expirée";

/// Serve a stored artifact as an attachment.
///
/// Ids that are not well-formed are indistinguishable from expired ones.
pub async fn download(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> ApiResult<Response> {
    let id: ArtifactId = video_id.parse().map_err(|_| ApiError::not_found(NOT_FOUND_MESSAGE))?;

    let artifact = match state.store.get(&id).await? {
        Lookup::Found(artifact) => artifact,
        Lookup::NotFound => return Err(ApiError::not_found(NOT_FOUND_MESSAGE)),
    };

    // The sweep may remove the file between lookup and read.
    let bytes = match tokio::fs::read(&artifact.path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::not_found(NOT_FOUND_MESSAGE))
        }
        Err(e) => return Err(ApiError::internal(format!("Failed to read artifact: {}", e))),
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, artifact.kind.mime_type())
        .header(header::CONTENT_LENGTH, bytes.len())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", artifact.download_name()),
        )
        .body(Body::from(bytes))
        .map_err(|e| ApiError::internal(format!("Failed to build response: {}", e)))
}
