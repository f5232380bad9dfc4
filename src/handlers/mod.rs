//! HTTP request handlers for the video host services.
//!
//! This module contains all endpoint handlers organized by functionality:
//! - `upload`: Accepts multipart video uploads (upload service)
//! - `serve`: Serves and deletes stored uploads (upload service)
//! - `presign`: Issues pre-signed object storage URLs (presign service)
//! - `health`: Health check endpoints (both services)

pub mod health;
pub mod presign;
pub mod serve;
pub mod upload;

pub use health::health_routes;
pub use presign::presign_routes;
pub use serve::serve_routes;
pub use upload::upload_routes;
