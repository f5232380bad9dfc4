//! Retrieval and deletion of stored uploads.
//!
//! ## Endpoints
//!
//! - `GET /uploads/{name}` - Serve a stored file
//! - `DELETE /uploads/{name}` - Delete a stored file
//!
//! Names are reduced to their final path segment before touching the disk.
//! File bodies, content types and range requests are handled by
//! `tower_http::services::ServeFile`; this module only resolves the name and
//! adds caching headers (`Cache-Control: public, max-age={from config}`).

use axum::{
    body::Body,
    extract::{Path, Request, State},
    http::{header, HeaderValue},
    response::Response,
    routing::get,
    Json, Router,
};
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::debug;

use crate::error::{AppError, Result};
use crate::models::DeleteResponse;
use crate::state::UploadState;

/// Serve a stored upload
///
/// GET /uploads/{name}
///
/// When `name` has no match, the configured video extensions are tried in
/// order (`name.mp4`, `name.webm`, ...).
async fn serve_upload(
    State(state): State<UploadState>,
    Path(name): Path<String>,
    request: Request,
) -> Result<Response> {
    let path = state
        .storage
        .find(&name, state.served_extensions())
        .await
        .ok_or(AppError::NotFound)?;

    let response = ServeFile::new(&path)
        .oneshot(request)
        .await
        .map_err(|e| AppError::internal(format!("Failed to serve file: {}", e)))?;

    let mut response = response.map(Body::new);

    let cache_control =
        HeaderValue::from_str(&format!("public, max-age={}", state.cache_max_age()))
            .map_err(|e| AppError::internal(format!("Invalid Cache-Control value: {}", e)))?;

    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, cache_control);
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );

    debug!(path = %path.display(), status = %response.status(), "Served upload");

    Ok(response)
}

/// Delete a stored upload
///
/// DELETE /uploads/{name}
///
/// Returns `{ "ok": true }`, or 404 `{ "error": "Not found" }`.
async fn delete_upload(
    State(state): State<UploadState>,
    Path(name): Path<String>,
) -> Result<Json<DeleteResponse>> {
    state.storage.delete(&name).await?;
    Ok(Json(DeleteResponse { ok: true }))
}

/// Create serve routes
pub fn serve_routes() -> Router<UploadState> {
    Router::new().route("/{name}", get(serve_upload).delete(delete_upload))
}
