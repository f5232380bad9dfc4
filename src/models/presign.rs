//! Pre-signed upload request/response DTOs.

use serde::{Deserialize, Serialize};

/// Request for a pre-signed upload URL
///
/// ```json
/// { "filename": "clip.mp4", "contentType": "video/mp4" }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    /// Object key, used verbatim
    pub filename: String,
    /// MIME type the client will send with its `PUT`
    pub content_type: String,
}

/// Signed upload URL plus the object's eventual public URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedUpload {
    pub upload_url: String,
    pub public_url: String,
}
