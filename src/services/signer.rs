//! Object storage signing for direct-to-bucket uploads.
//!
//! The presign handler only talks to the [`ObjectSigner`] trait. The S3
//! implementation signs locally with SigV4 through `rust-s3`; no request is
//! sent to the storage provider until the client uses the URL itself.

use async_trait::async_trait;
use http02::{header, HeaderMap, HeaderValue};
use s3::creds::Credentials;
use s3::{Bucket, Region};
use tracing::{debug, warn};

use crate::config::PresignConfig;
use crate::error::{AppError, Result};

/// Signs `PUT` uploads for object keys and knows where they will be public
#[async_trait]
pub trait ObjectSigner: Send + Sync {
    /// Signed URL authorising one `PUT` of `key` with `content_type`,
    /// valid for `expiry_secs`
    async fn presign_put(&self, key: &str, content_type: &str, expiry_secs: u32)
        -> Result<String>;

    /// Public retrieval URL of `key` once it exists
    fn public_url(&self, key: &str) -> Result<String>;
}

/// Build the signer for `config`.
///
/// Incomplete configuration does not fail startup; it yields a signer that
/// reports the missing settings on every request.
pub fn from_config(config: &PresignConfig) -> Box<dyn ObjectSigner> {
    match S3Signer::new(config) {
        Ok(signer) => Box::new(signer),
        Err(e) => {
            warn!(error = %e, "Pre-signing disabled");
            let reason = match e {
                AppError::ConfigurationMissing(settings) => settings,
                other => other.to_string(),
            };
            Box::new(UnconfiguredSigner { reason })
        }
    }
}

/// `https://{bucket}.s3.{region}.amazonaws.com/{key}`
pub fn public_object_url(bucket: &str, region: &str, key: &str) -> String {
    format!("https://{}.s3.{}.amazonaws.com/{}", bucket, region, key)
}

/// AWS S3 signer
pub struct S3Signer {
    bucket: Box<Bucket>,
    bucket_name: String,
    region: String,
}

impl S3Signer {
    /// Create a signer from configuration
    ///
    /// # Errors
    /// `ConfigurationMissing` when bucket, region or credentials are absent
    pub fn new(config: &PresignConfig) -> Result<Self> {
        let missing = config.missing_settings();
        if !missing.is_empty() {
            return Err(AppError::configuration_missing(missing.join(", ")));
        }

        let (Some(bucket_name), Some(region), Some(access_key), Some(secret_key)) = (
            config.bucket.as_deref(),
            config.region.as_deref(),
            config.access_key_id.as_deref(),
            config.secret_access_key.as_deref(),
        ) else {
            return Err(AppError::configuration_missing("storage settings"));
        };

        let credentials =
            Credentials::new(Some(access_key), Some(secret_key), None, None, None)
                .map_err(|e| AppError::configuration_missing(format!("credentials: {}", e)))?;

        let parsed_region: Region = region
            .parse()
            .map_err(|e| AppError::configuration_missing(format!("region {}: {}", region, e)))?;

        let bucket = Bucket::new(bucket_name, parsed_region, credentials)?;

        debug!(bucket = %bucket_name, region = %region, "S3 signer initialized");

        Ok(Self {
            bucket,
            bucket_name: bucket_name.to_string(),
            region: region.to_string(),
        })
    }
}

#[async_trait]
impl ObjectSigner for S3Signer {
    async fn presign_put(
        &self,
        key: &str,
        content_type: &str,
        expiry_secs: u32,
    ) -> Result<String> {
        let content_type = HeaderValue::from_str(content_type)
            .map_err(|_| AppError::validation("contentType is not a valid header value"))?;

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, content_type);

        let url = self
            .bucket
            .presign_put(key, expiry_secs, Some(headers), None)
            .await?;

        Ok(url)
    }

    fn public_url(&self, key: &str) -> Result<String> {
        Ok(public_object_url(&self.bucket_name, &self.region, key))
    }
}

/// Stand-in used when signing settings are incomplete
pub struct UnconfiguredSigner {
    reason: String,
}

#[async_trait]
impl ObjectSigner for UnconfiguredSigner {
    async fn presign_put(
        &self,
        _key: &str,
        _content_type: &str,
        _expiry_secs: u32,
    ) -> Result<String> {
        Err(AppError::configuration_missing(self.reason.clone()))
    }

    fn public_url(&self, _key: &str) -> Result<String> {
        Err(AppError::configuration_missing(self.reason.clone()))
    }
}
