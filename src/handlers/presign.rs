//! Pre-signed upload URL endpoint.
//!
//! `POST /presign` returns a URL the client can `PUT` the object to
//! directly, plus the URL the object will be publicly reachable at. The
//! object name is used verbatim as the storage key; the service never sees
//! the object's bytes.
//!
//! # Example
//!
//! ```bash
//! curl -X POST http://localhost:3000/presign \
//!   -H "Content-Type: application/json" \
//!   -d '{"filename": "clip.mp4", "contentType": "video/mp4"}'
//! ```

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use tracing::info;

use crate::error::{AppError, Result};
use crate::models::{PresignedUpload, UploadRequest};
use crate::state::PresignState;

/// Issue a pre-signed upload URL
///
/// POST /presign
async fn create_presigned_upload(
    State(state): State<PresignState>,
    payload: std::result::Result<Json<UploadRequest>, JsonRejection>,
) -> Result<Json<PresignedUpload>> {
    let Json(request) = payload.map_err(|e| AppError::validation(e.body_text()))?;

    if request.filename.is_empty() {
        return Err(AppError::validation("filename must not be empty"));
    }

    let upload_url = state
        .signer
        .presign_put(&request.filename, &request.content_type, state.expiry_secs())
        .await?;
    let public_url = state.signer.public_url(&request.filename)?;

    info!(
        key = %request.filename,
        content_type = %request.content_type,
        expires_in = state.expiry_secs(),
        "Issued pre-signed upload URL"
    );

    Ok(Json(PresignedUpload {
        upload_url,
        public_url,
    }))
}

/// Create presign routes
pub fn presign_routes() -> Router<PresignState> {
    Router::new().route("/presign", post(create_presigned_upload))
}
