//! Upload admission checks and generated file naming.
//!
//! An upload is admitted in two steps: its declared MIME type is checked
//! against the allow-list before any byte is read, and its running size is
//! checked against the ceiling while it streams. Accepted files are named
//!
//! ```text
//! {unix millis}_{sanitized base, <= 30 chars}{extension, <= 10 chars}
//! ```
//!
//! Only `[A-Za-z0-9._-]` survives sanitisation, so a generated name never
//! contains a path separator.

use crate::config::UploadConfig;
use crate::error::{AppError, Result};

/// Maximum length of the sanitized base name
pub const MAX_BASE_LEN: usize = 30;

/// Maximum length of the extension, leading dot included
pub const MAX_EXT_LEN: usize = 10;

/// Extension used when the original name has none
pub const DEFAULT_EXTENSION: &str = ".mp4";

/// Admission rules for uploaded files
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    allowed_types: Vec<String>,
    max_size: u64,
}

impl UploadPolicy {
    /// Create a policy from upload configuration
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            allowed_types: config.allowed_video_types.clone(),
            max_size: config.max_upload_size,
        }
    }

    /// Maximum accepted size in bytes
    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Reject MIME types outside the allow-list
    pub fn check_type(&self, declared_mime: &str) -> Result<()> {
        if self.allowed_types.iter().any(|t| t == declared_mime) {
            Ok(())
        } else {
            Err(AppError::invalid_file_type(declared_mime))
        }
    }

    /// Reject sizes above the ceiling (the ceiling itself is accepted)
    pub fn check_size(&self, size: u64) -> Result<()> {
        if size > self.max_size {
            Err(AppError::FileTooLarge { max: self.max_size })
        } else {
            Ok(())
        }
    }
}

/// Build the stored name for `original_name` uploaded at `timestamp_ms`
pub fn generate_name(original_name: &str, timestamp_ms: i64) -> String {
    let (base, ext) = split_extension(original_name);

    let mut ext: String = sanitize(ext).chars().take(MAX_EXT_LEN).collect();
    if ext.is_empty() || ext == "." {
        ext = DEFAULT_EXTENSION.to_string();
    }

    let safe: String = sanitize(base).chars().take(MAX_BASE_LEN).collect();

    format!("{}_{}{}", timestamp_ms, safe, ext)
}

/// Split `name` into base and extension (dot included).
///
/// The extension starts at the last dot of the final path segment, unless
/// that dot is the segment's first character (`.bashrc` has no extension).
fn split_extension(name: &str) -> (&str, &str) {
    let segment_start = name.rfind(['/', '\\']).map_or(0, |i| i + 1);

    match name[segment_start..].rfind('.') {
        Some(0) | None => (name, ""),
        Some(i) => name.split_at(segment_start + i),
    }
}

/// Replace every character outside `[A-Za-z0-9._-]` with `_`
fn sanitize(input: &str) -> String {
    input
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Reduce a client-supplied name to its final path segment.
///
/// Returns `None` for names that do not designate a file (`""`, `.`, `..`).
pub fn basename(name: &str) -> Option<&str> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);

    match base {
        "" | "." | ".." => None,
        _ => Some(base),
    }
}
