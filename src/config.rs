//! Configuration module for the video host services.
//!
//! Configuration is built once at startup and handed to the services that
//! need it. Nothing downstream reads the process environment on its own.
//!
//! # Configuration Sources (in order of priority)
//! 1. Environment overrides (`PORT`, `HOSTNAME`, `BUCKET`, `AWS_REGION`,
//!    `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`)
//! 2. `config.local.toml` - Local overrides (gitignored)
//! 3. `config.toml` - Main configuration file
//! 4. Default values
//!
//! # Example
//! ```rust,ignore
//! let config = Config::load_default()?;
//! println!("Server will listen on {}:{}", config.server.host, config.server.port);
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default size ceiling for a single upload: 500 MiB.
pub const DEFAULT_MAX_UPLOAD_SIZE: u64 = 500 * 1024 * 1024;

/// Default validity window of a pre-signed upload URL.
pub const DEFAULT_PRESIGN_EXPIRY_SECS: u32 = 300;

/// Upper bound S3 accepts for a SigV4 pre-signed URL (7 days).
const MAX_PRESIGN_EXPIRY_SECS: u32 = 604_800;

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub upload: UploadConfig,
    pub presign: PresignConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for returned file URLs. When unset the request's
    /// `Host` header is used instead.
    pub public_base_url: Option<String>,
    /// Cache-Control max-age in seconds for served uploads (default: 1 day)
    pub cache_max_age: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            public_base_url: None,
            cache_max_age: 86_400,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding published uploads (served at `/uploads`)
    pub upload_dir: PathBuf,
    /// Directory for in-flight uploads. Must not be inside `upload_dir`.
    pub temp_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            temp_dir: PathBuf::from("uploads.tmp"),
        }
    }
}

/// Upload admission configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Maximum accepted file size in bytes (inclusive)
    pub max_upload_size: u64,
    /// Allowed declared MIME types
    pub allowed_video_types: Vec<String>,
    /// Extensions tried when a retrieval request names a file without one
    pub served_extensions: Vec<String>,
    /// Multipart field carrying the file
    pub field_name: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
            allowed_video_types: [
                "video/mp4",
                "video/webm",
                "video/ogg",
                "video/quicktime",
                "video/x-matroska",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            served_extensions: ["mp4", "webm", "ogg", "mov", "mkv"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            field_name: "video".to_string(),
        }
    }
}

/// Object storage pre-signing configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PresignConfig {
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// Validity window of issued upload URLs
    pub expiry_secs: u32,
    /// Directory with the landing page and static assets
    pub public_dir: PathBuf,
}

impl Default for PresignConfig {
    fn default() -> Self {
        Self {
            bucket: None,
            region: None,
            access_key_id: None,
            secret_access_key: None,
            expiry_secs: DEFAULT_PRESIGN_EXPIRY_SECS,
            public_dir: PathBuf::from("public"),
        }
    }
}

impl PresignConfig {
    /// Names of the settings required for signing that are absent or blank
    pub fn missing_settings(&self) -> Vec<&'static str> {
        let blank = |v: &Option<String>| v.as_deref().map_or(true, |s| s.trim().is_empty());

        [
            ("BUCKET", &self.bucket),
            ("AWS_REGION", &self.region),
            ("AWS_ACCESS_KEY_ID", &self.access_key_id),
            ("AWS_SECRET_ACCESS_KEY", &self.secret_access_key),
        ]
        .into_iter()
        .filter(|(_, v)| blank(*v))
        .map(|(name, _)| name)
        .collect()
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a file path
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read or parsed
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from default locations and the environment
    ///
    /// Tries `config.local.toml`, then `config.toml`, then falls back to
    /// built-in defaults. Environment overrides are applied last.
    pub fn load_default() -> Result<Self, ConfigError> {
        let mut config = if Path::new("config.local.toml").exists() {
            Self::load("config.local.toml")?
        } else if Path::new("config.toml").exists() {
            Self::load("config.toml")?
        } else {
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment-style overrides from `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(port) = lookup("PORT") {
            self.server.port = port.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!("PORT is not a valid port: {}", port))
            })?;
        }

        if let Some(host) = lookup("HOSTNAME") {
            self.server.public_base_url = Some(normalize_base_url(&host));
        }

        if let Some(bucket) = lookup("BUCKET") {
            self.presign.bucket = Some(bucket);
        }
        if let Some(region) = lookup("AWS_REGION") {
            self.presign.region = Some(region);
        }
        if let Some(key) = lookup("AWS_ACCESS_KEY_ID") {
            self.presign.access_key_id = Some(key);
        }
        if let Some(secret) = lookup("AWS_SECRET_ACCESS_KEY") {
            self.presign.secret_access_key = Some(secret);
        }

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(base_url) = &self.server.public_base_url {
            if base_url.ends_with('/') {
                return Err(ConfigError::ValidationError(
                    "public_base_url should not have a trailing slash".to_string(),
                ));
            }
        }

        if self.upload.max_upload_size == 0 {
            return Err(ConfigError::ValidationError(
                "max_upload_size must be greater than 0".to_string(),
            ));
        }

        if self.upload.allowed_video_types.is_empty() {
            return Err(ConfigError::ValidationError(
                "allowed_video_types must not be empty".to_string(),
            ));
        }

        if self.presign.expiry_secs == 0 || self.presign.expiry_secs > MAX_PRESIGN_EXPIRY_SECS {
            return Err(ConfigError::ValidationError(format!(
                "expiry_secs must be between 1 and {}",
                MAX_PRESIGN_EXPIRY_SECS
            )));
        }

        if self.storage.temp_dir.starts_with(&self.storage.upload_dir) {
            return Err(ConfigError::ValidationError(
                "temp_dir must not be inside upload_dir".to_string(),
            ));
        }

        Ok(())
    }
}

/// Turn a bare host (`videos.example.com`) into a base URL without trailing slash
fn normalize_base_url(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{}", host)
    }
}
