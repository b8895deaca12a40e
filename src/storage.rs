use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::presigning::PresigningConfig;
use s3::primitives::ByteStream;

/// How long an archived report's download link stays valid.
pub const DOWNLOAD_URL_TTL: Duration = Duration::from_secs(600);

/// StorageService
///
/// Object storage for archived report exports. The S3 client is used against MinIO
/// locally and Supabase Storage in production; tests use the mock.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Creates the configured bucket if missing. Only called in `Env::Local`.
    async fn ensure_bucket_exists(&self);

    /// Uploads `body` under `key`.
    async fn put_object(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), String>;

    /// A short-lived GET URL for `key`.
    async fn get_presigned_download_url(&self, key: &str) -> Result<String, String>;
}

/// S3StorageClient
///
/// `force_path_style(true)` is required by both MinIO and the Supabase gateway.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    bucket_name: String,
}

impl S3StorageClient {
    pub async fn new(endpoint: &str, region: &str, access_key: &str, secret_key: &str, bucket: &str) -> Self {
        let credentials = s3::config::Credentials::new(access_key, secret_key, None, None, "static");

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

#[async_trait]
impl StorageService for S3StorageClient {
    async fn ensure_bucket_exists(&self) {
        // CreateBucket on an existing bucket errors harmlessly.
        if let Err(e) = self.client.create_bucket().bucket(&self.bucket_name).send().await {
            tracing::debug!(bucket = %self.bucket_name, error = ?e, "create_bucket skipped");
        }
    }

    async fn put_object(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), String> {
        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(sanitize_key(key))
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    async fn get_presigned_download_url(&self, key: &str) -> Result<String, String> {
        let presigning = PresigningConfig::expires_in(DOWNLOAD_URL_TTL).map_err(|e| e.to_string())?;

        let presigned_req = self
            .client
            .get_object()
            .bucket(&self.bucket_name)
            .key(sanitize_key(key))
            .presigned(presigning)
            .await
            .map_err(|e| e.to_string())?;

        Ok(presigned_req.uri().to_string())
    }
}

/// sanitize_key
///
/// Drops empty, `.` and `..` segments so a key cannot climb out of its prefix.
pub fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// MockStorageService
///
/// In-memory stand-in used by tests. Remembers uploaded keys so assertions can
/// check what was archived.
#[derive(Clone, Default)]
pub struct MockStorageService {
    /// When true, every operation returns a simulated failure.
    pub should_fail: bool,
    uploads: Arc<Mutex<Vec<(String, usize)>>>,
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

    /// Keys and sizes of every object uploaded so far.
    pub fn uploads(&self) -> Vec<(String, usize)> {
        self.uploads.lock().map(|u| u.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) {}

    async fn put_object(&self, key: &str, body: Vec<u8>, _content_type: &str) -> Result<(), String> {
        if self.should_fail {
            return Err("Mock Storage Error: Simulation requested".to_string());
        }
        if let Ok(mut uploads) = self.uploads.lock() {
            uploads.push((sanitize_key(key), body.len()));
        }
        Ok(())
    }

    async fn get_presigned_download_url(&self, key: &str) -> Result<String, String> {
        if self.should_fail {
            return Err("Mock Storage Error: Simulation requested".to_string());
        }
        Ok(format!(
            "http://localhost:9000/mock-bucket/{}?signature=fake",
            sanitize_key(key)
        ))
    }
}

/// StorageState
///
/// The shared handle stored in `AppState`.
pub type StorageState = Arc<dyn StorageService>;
