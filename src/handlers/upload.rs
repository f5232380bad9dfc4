//! Upload handlers for receiving video files.
//!
//! ## Endpoints
//! - `GET /` - Liveness text
//! - `POST /upload` - Multipart upload, file in the `video` field
//!
//! The declared MIME type is checked before any byte is written. The file
//! is then streamed into the staging directory chunk by chunk, with the size
//! ceiling enforced as it grows, and published under a generated name once
//! complete.
//!
//! # Example
//!
//! ```bash
//! curl -X POST http://localhost:3000/upload \
//!   -F "video=@clip.mp4;type=video/mp4"
//! ```

use axum::{
    extract::{multipart::Field, multipart::MultipartError, Multipart, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use tracing::{debug, info};

use crate::error::{AppError, Result};
use crate::models::UploadResponse;
use crate::services::{StagedFile, UploadPolicy};
use crate::state::UploadState;

/// Name used when the file part carries no filename
const FALLBACK_FILENAME: &str = "video";

/// GET /
async fn index() -> &'static str {
    "Video host server is running."
}

/// Handle a multipart video upload
///
/// POST /upload
///
/// Fields other than the configured file field are skipped. Returns
/// `{ url, filename, size }` for the stored file.
async fn upload_video(
    State(state): State<UploadState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let max_size = state.policy.max_size();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_size))?
    {
        if field.name() != Some(state.field_name()) {
            debug!(field = ?field.name(), "Skipping multipart field");
            continue;
        }

        let original_name = field
            .file_name()
            .filter(|name| !name.is_empty())
            .unwrap_or(FALLBACK_FILENAME)
            .to_string();
        let mime_type = field.content_type().unwrap_or_default().to_string();

        state.policy.check_type(&mime_type)?;
        let accepted_at = Utc::now().timestamp_millis();

        info!(filename = %original_name, mime_type = %mime_type, "Receiving upload");

        let staged = receive(&state, &mut field).await?;
        let stored = state
            .storage
            .publish(staged, &original_name, accepted_at)
            .await?;

        let base_url = base_url(&state, &headers);
        return Ok(Json(UploadResponse::from_stored(&stored, &base_url)));
    }

    Err(AppError::NoFileProvided)
}

/// Stream a file field into a new staging file.
///
/// The staging file is removed if the field cannot be read completely or
/// grows past the size ceiling.
async fn receive(state: &UploadState, field: &mut Field<'_>) -> Result<StagedFile> {
    let mut staged = state.storage.create_staged().await?;

    match copy_field(&state.policy, field, &mut staged).await {
        Ok(()) => Ok(staged),
        Err(e) => {
            staged.discard().await;
            Err(e)
        }
    }
}

async fn copy_field(
    policy: &UploadPolicy,
    field: &mut Field<'_>,
    staged: &mut StagedFile,
) -> Result<()> {
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| multipart_error(e, policy.max_size()))?
    {
        policy.check_size(staged.written() + chunk.len() as u64)?;
        staged.write(&chunk).await?;
    }
    Ok(())
}

/// Map multipart failures, treating body-limit hits as oversize uploads
fn multipart_error(err: MultipartError, max_size: u64) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::FileTooLarge { max: max_size }
    } else {
        err.into()
    }
}

/// Base URL for returned file URLs: configured value, else derived from
/// the request's `Host` and `X-Forwarded-Proto` headers
fn base_url(state: &UploadState, headers: &HeaderMap) -> String {
    if let Some(base) = state.public_base_url() {
        return base.to_string();
    }

    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("http");

    format!("{}://{}", scheme, host)
}

/// Create upload routes
pub fn upload_routes() -> Router<UploadState> {
    Router::new()
        .route("/", get(index))
        .route("/upload", post(upload_video))
}
