//! Data models for the video host services.
//!
//! This module contains the request and response types exchanged over HTTP
//! and the record describing a file accepted by the upload service.

mod presign;
mod stored_file;

pub use presign::*;
pub use stored_file::*;
