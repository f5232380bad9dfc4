//! Error types for the video host services.
//!
//! This module defines a unified error handling system using `thiserror`.
//! All errors are converted to appropriate HTTP responses at the request
//! boundary; none propagate past a handler.
//!
//! # Error Categories
//!
//! - **Client errors (4xx)**: rejected uploads, missing files, bad input
//! - **Server errors (5xx)**: missing signing configuration, I/O failures
//!
//! # Example
//!
//! ```rust,ignore
//! use crate::error::{AppError, Result};
//!
//! fn check(mime: &str) -> Result<()> {
//!     if !mime.starts_with("video/") {
//!         return Err(AppError::invalid_file_type(mime));
//!     }
//!     Ok(())
//! }
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
///
/// Each variant is mapped to an HTTP status code. The `Display` text of a
/// client error is what the caller sees in the `error` field of the body.
#[derive(Debug, Error)]
pub enum AppError {
    // -------------------------------------------------------------------------
    // Client Errors (4xx)
    // -------------------------------------------------------------------------
    /// Invalid request
    #[error("{0}")]
    Validation(String),

    /// Upload request carried no file part
    #[error("No file uploaded")]
    NoFileProvided,

    /// Declared media type is not on the allow-list
    #[error("Invalid file type: {0}")]
    InvalidFileType(String),

    /// Upload exceeded the size ceiling
    #[error("File too large: maximum size is {max} bytes")]
    FileTooLarge { max: u64 },

    /// Named file does not exist
    #[error("Not found")]
    NotFound,

    // -------------------------------------------------------------------------
    // Server Errors (5xx)
    // -------------------------------------------------------------------------
    /// Bucket, region or credentials are not configured
    #[error("Storage configuration missing: {0}")]
    ConfigurationMissing(String),

    /// The storage signer refused to produce a URL
    #[error("Signing error: {0}")]
    Signing(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    // -------------------------------------------------------------------------
    // Convenience constructors
    // -------------------------------------------------------------------------

    /// Create a validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an invalid file type error
    pub fn invalid_file_type<S: Into<String>>(mime: S) -> Self {
        Self::InvalidFileType(mime.into())
    }

    /// Create a configuration missing error
    pub fn configuration_missing<S: Into<String>>(msg: S) -> Self {
        Self::ConfigurationMissing(msg.into())
    }

    /// Create a signing error
    pub fn signing<S: Into<String>>(msg: S) -> Self {
        Self::Signing(msg.into())
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 4xx Client Errors
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NoFileProvided => StatusCode::BAD_REQUEST,
            Self::InvalidFileType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotFound => StatusCode::NOT_FOUND,

            // 5xx Server Errors
            Self::ConfigurationMissing(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Signing(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error kind
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NoFileProvided => "no_file_provided",
            Self::InvalidFileType(_) => "invalid_file_type",
            Self::FileTooLarge { .. } => "file_too_large",
            Self::NotFound => "not_found",
            Self::ConfigurationMissing(_) => "configuration_missing",
            Self::Signing(_) => "signing_error",
            Self::Internal(_) => "internal_error",
            Self::Io(_) => "io_error",
        }
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

/// Error response body sent to clients
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,
    /// Error kind
    pub code: &'static str,
    /// HTTP status code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    /// Create a new error response
    pub fn new(error: impl Into<String>, code: &'static str) -> Self {
        Self {
            error: error.into(),
            code,
            status: None,
        }
    }

    /// Add status code to the response
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status.as_u16());
        self
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if self.is_server_error() {
            tracing::error!(error = %self, "Server error occurred");
        } else {
            tracing::debug!(error = %self, "Client error occurred");
        }

        // For server errors, don't expose internal details to clients
        let message = if self.is_server_error() {
            "An internal error occurred. Please try again later.".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse::new(message, self.code()).with_status(status);

        (status, Json(body)).into_response()
    }
}

// -------------------------------------------------------------------------
// Error conversions from external crates
// -------------------------------------------------------------------------

impl From<axum::extract::multipart::MultipartError> for AppError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        Self::Validation(format!("Invalid multipart data: {}", err.body_text()))
    }
}

impl From<s3::error::S3Error> for AppError {
    fn from(err: s3::error::S3Error) -> Self {
        Self::Signing(err.to_string())
    }
}
