//! Application state for the two services.
//!
//! Each service has its own state type; they share nothing at runtime.
//! Handlers receive them through Axum's `State` extractor.
//!
//! # Usage
//!
//! ```rust,ignore
//! async fn handler(State(state): State<UploadState>) -> impl IntoResponse {
//!     state.storage.delete(&name).await?;
//!     // ...
//! }
//! ```

use crate::config::Config;
use crate::error::Result;
use crate::services::{signer, ObjectSigner, StorageService, UploadPolicy};
use std::sync::Arc;

/// Shared state of the upload service
#[derive(Clone)]
pub struct UploadState {
    /// Application configuration
    pub config: Arc<Config>,

    /// Storage service for file operations
    pub storage: Arc<StorageService>,

    /// Admission rules for incoming files
    pub policy: Arc<UploadPolicy>,
}

impl UploadState {
    /// Create the upload service state
    ///
    /// Creates the upload and staging directories if they are missing.
    ///
    /// # Errors
    /// Returns error if the directories cannot be created
    pub async fn new(config: Config) -> Result<Self> {
        let storage = StorageService::new(&config.storage).await?;
        let policy = UploadPolicy::new(&config.upload);

        Ok(Self {
            config: Arc::new(config),
            storage: Arc::new(storage),
            policy: Arc::new(policy),
        })
    }

    /// Configured public base URL, if any
    pub fn public_base_url(&self) -> Option<&str> {
        self.config.server.public_base_url.as_deref()
    }

    /// Get cache max age in seconds
    pub fn cache_max_age(&self) -> u64 {
        self.config.server.cache_max_age
    }

    /// Extensions tried for retrieval requests without one
    pub fn served_extensions(&self) -> &[String] {
        &self.config.upload.served_extensions
    }

    /// Multipart field carrying the upload
    pub fn field_name(&self) -> &str {
        &self.config.upload.field_name
    }
}

impl std::fmt::Debug for UploadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadState")
            .field("config", &"<Config>")
            .field("storage", &self.storage)
            .field("policy", &self.policy)
            .finish()
    }
}

/// Shared state of the presign service
#[derive(Clone)]
pub struct PresignState {
    /// Application configuration
    pub config: Arc<Config>,

    /// Object storage signer
    pub signer: Arc<dyn ObjectSigner>,
}

impl PresignState {
    /// Create the presign service state from configuration
    pub fn new(config: Config) -> Self {
        let signer: Arc<dyn ObjectSigner> = Arc::from(signer::from_config(&config.presign));
        Self::with_signer(config, signer)
    }

    /// Create the presign service state around an existing signer
    pub fn with_signer(config: Config, signer: Arc<dyn ObjectSigner>) -> Self {
        Self {
            config: Arc::new(config),
            signer,
        }
    }

    /// Validity window of issued URLs
    pub fn expiry_secs(&self) -> u32 {
        self.config.presign.expiry_secs
    }
}

impl std::fmt::Debug for PresignState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresignState")
            .field("config", &"<Config>")
            .field("signer", &"<ObjectSigner>")
            .finish()
    }
}
