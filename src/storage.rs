use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::presigning::PresigningConfig;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Lifetime of a presigned PUT URL.
const UPLOAD_URL_TTL: Duration = Duration::from_secs(600);
/// Lifetime of a presigned GET URL.
const DOWNLOAD_URL_TTL: Duration = Duration::from_secs(3600);

// 1. StorageService Contract
/// StorageService
///
/// The contract for everything the API does with object storage: the real S3 client
/// (S3StorageClient) in deployments, the in-memory MockStorageService in tests.
/// Handlers never see bytes; clients upload and download through presigned URLs.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Provisions the configured bucket. Only called in `Env::Local` (MinIO).
    async fn ensure_bucket_exists(&self);

    /// A signed PUT URL bound to `content_type`, valid for ten minutes.
    async fn get_presigned_upload_url(&self, key: &str, content_type: &str) -> AppResult<String>;

    /// A signed GET URL, valid for one hour.
    async fn get_presigned_download_url(&self, key: &str) -> AppResult<String>;

    async fn delete_object(&self, key: &str) -> AppResult<()>;
}

// 2. The Real Implementation (S3/MinIO)
/// S3StorageClient
///
/// `force_path_style(true)` is required for MinIO and most S3-compatible gateways.
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
}

fn presigning(ttl: Duration) -> AppResult<PresigningConfig> {
    PresigningConfig::expires_in(ttl).map_err(|e| AppError::Storage(e.to_string()))
}

#[async_trait]
impl StorageService for S3StorageClient {
    /// CreateBucket fails harmlessly when the bucket already exists.
    async fn ensure_bucket_exists(&self) {
        if let Err(e) = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
        {
            tracing::debug!(bucket = %self.bucket_name, error = %e, "create_bucket skipped");
        }
    }

    async fn get_presigned_upload_url(&self, key: &str, content_type: &str) -> AppResult<String> {
        let presigned = self
            .client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            // The client's PUT must carry exactly this Content-Type.
            .content_type(content_type)
            .presigned(presigning(UPLOAD_URL_TTL)?)
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        Ok(presigned.uri().to_string())
    }

    async fn get_presigned_download_url(&self, key: &str) -> AppResult<String> {
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket_name)
            .key(key)
            .presigned(presigning(DOWNLOAD_URL_TTL)?)
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        Ok(presigned.uri().to_string())
    }

    async fn delete_object(&self, key: &str) -> AppResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;
        Ok(())
    }
}

/// sanitize_key
///
/// Strips empty, `.` and `..` segments from an object key.
pub fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

// 3. The Mock Implementation (For Tests)
/// MockStorageService
///
/// Deterministic URLs and a record of deleted keys, with no network access.
#[derive(Clone, Default)]
pub struct MockStorageService {
    /// When true, all operations return a simulated failure.
    pub should_fail: bool,
    deleted: Arc<Mutex<Vec<String>>>,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Keys passed to `delete_object`, in call order.
    pub fn deleted_keys(&self) -> Vec<String> {
        self.deleted
            .lock()
            .map(|keys| keys.clone())
            .unwrap_or_default()
    }

    fn check(&self) -> AppResult<()> {
        if self.should_fail {
            Err(AppError::Storage(
                "Mock Storage Error: Simulation requested".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) {}

    async fn get_presigned_upload_url(&self, key: &str, _content_type: &str) -> AppResult<String> {
        self.check()?;
        Ok(format!(
            "http://localhost:9000/mock-bucket/{}?signature=fake",
            sanitize_key(key)
        ))
    }

    async fn get_presigned_download_url(&self, key: &str) -> AppResult<String> {
        self.check()?;
        Ok(format!(
            "http://localhost:9000/mock-bucket/{}?download=fake",
            sanitize_key(key)
        ))
    }

    async fn delete_object(&self, key: &str) -> AppResult<()> {
        self.check()?;
        if let Ok(mut keys) = self.deleted.lock() {
            keys.push(key.to_string());
        }
        Ok(())
    }
}

/// StorageState
///
/// The concrete type used to share storage access across the application state.
pub type StorageState = Arc<dyn StorageService>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traversal_segments_are_removed() {
        assert_eq!(sanitize_key("orgs/../../etc/./passwd"), "orgs/etc/passwd");
        assert_eq!(sanitize_key("//a//b/"), "a/b");
    }
}
