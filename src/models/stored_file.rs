//! Stored upload record and upload service responses.

use serde::Serialize;
use std::path::PathBuf;

/// A file accepted by the upload service and published to the upload directory
#[derive(Debug, Clone)]
pub struct StoredFile {
    /// Generated name, unique within the upload directory
    pub filename: String,
    /// Size in bytes
    pub size: u64,
    /// Absolute location on disk
    pub path: PathBuf,
}

impl StoredFile {
    /// Public retrieval URL for this file under `base_url`
    pub fn url(&self, base_url: &str) -> String {
        format!(
            "{}/uploads/{}",
            base_url.trim_end_matches('/'),
            urlencoding::encode(&self.filename)
        )
    }
}

/// Response body of a successful upload
#[derive(Debug, Clone, Serialize)]
pub struct UploadResponse {
    pub url: String,
    pub filename: String,
    pub size: u64,
}

impl UploadResponse {
    /// Build a response for a stored file
    pub fn from_stored(file: &StoredFile, base_url: &str) -> Self {
        Self {
            url: file.url(base_url),
            filename: file.filename.clone(),
            size: file.size,
        }
    }
}

/// Response body of a successful delete
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub ok: bool,
}
