use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::presigning::PresigningConfig;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::namespace::sanitize_key;

/// Validity of every presigned URL handed out.
pub const PRESIGNED_URL_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid presigning config: {0}")]
    Config(String),
    #[error("presigning failed: {0}")]
    Presign(String),
    #[error("simulated storage failure")]
    Simulated,
}

/// StorageService
///
/// Contract for the object storage layer. Callers must run
/// `namespace::authorize_object_access` (or build the key with
/// `namespace::scoped_object_name`) before asking for a URL; this layer signs
/// whatever key it is given.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Creates the configured bucket if missing. Used for the local MinIO
    /// setup.
    async fn ensure_bucket_exists(&self);

    /// Time-limited URL allowing a client to PUT `key` directly.
    async fn presigned_upload_url(&self, key: &str) -> Result<String, StorageError>;

    /// Time-limited URL allowing a client to GET `key` directly.
    async fn presigned_download_url(&self, key: &str) -> Result<String, StorageError>;
}

/// S3StorageClient
///
/// AWS SDK client pointed at an S3-compatible endpoint (MinIO). Path-style
/// addressing is forced because MinIO does not serve virtual-host buckets by
/// default.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    bucket_name: String,
}

impl S3StorageClient {
    pub async fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            .force_path_style(true)
            .build();

        Self {
            client: s3::Client::from_conf(config),
            bucket_name: bucket.to_string(),
        }
    }

    fn presigning_config() -> Result<PresigningConfig, StorageError> {
        PresigningConfig::expires_in(PRESIGNED_URL_TTL)
            .map_err(|e| StorageError::Config(e.to_string()))
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    async fn ensure_bucket_exists(&self) {
        match self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
        {
            Ok(_) => tracing::info!(bucket = %self.bucket_name, "bucket created"),
            // Already-owned buckets land here too.
            Err(e) => tracing::debug!(
                bucket = %self.bucket_name,
                error = %e,
                "create_bucket skipped"
            ),
        }
    }

    async fn presigned_upload_url(&self, key: &str) -> Result<String, StorageError> {
        let presigned = self
            .client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .presigned(Self::presigning_config()?)
            .await
            .map_err(|e| StorageError::Presign(e.to_string()))?;

        Ok(presigned.uri().to_string())
    }

    async fn presigned_download_url(&self, key: &str) -> Result<String, StorageError> {
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket_name)
            .key(key)
            .presigned(Self::presigning_config()?)
            .await
            .map_err(|e| StorageError::Presign(e.to_string()))?;

        Ok(presigned.uri().to_string())
    }
}

/// MockStorageService
///
/// Deterministic stand-in for tests: URLs embed the key and the operation so
/// assertions can check what was signed.
#[derive(Clone, Default)]
pub struct MockStorageService {
    /// When true, all operations return a simulated failure.
    pub should_fail: bool,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self { should_fail: false }
    }

    pub fn new_failing() -> Self {
        Self { should_fail: true }
    }

    fn url(&self, method: &str, key: &str) -> Result<String, StorageError> {
        if self.should_fail {
            return Err(StorageError::Simulated);
        }
        Ok(format!(
            "http://localhost:9000/mock-bucket/{}?method={}&expires={}&signature=fake",
            sanitize_key(key),
            method,
            PRESIGNED_URL_TTL.as_secs()
        ))
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) {}

    async fn presigned_upload_url(&self, key: &str) -> Result<String, StorageError> {
        self.url("PUT", key)
    }

    async fn presigned_download_url(&self, key: &str) -> Result<String, StorageError> {
        self.url("GET", key)
    }
}

/// StorageState
///
/// The concrete type used to share the storage service across the
/// application state.
pub type StorageState = Arc<dyn StorageService>;
