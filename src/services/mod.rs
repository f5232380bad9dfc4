//! Service layer for the video host services.
//!
//! This module contains the logic behind the HTTP handlers:
//! - Upload admission and generated naming
//! - Local file storage for the upload service
//! - Object storage URL signing for the presign service

pub mod admission;
pub mod signer;
pub mod storage;

pub use admission::UploadPolicy;
pub use signer::{ObjectSigner, S3Signer, UnconfiguredSigner};
pub use storage::{StagedFile, StorageService};
