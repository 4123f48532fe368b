//! S3 backend: presigned PUT URLs and direct uploads.

use std::time::Duration;

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;

use crate::config::S3Settings;
use crate::error::StorageError;

/// Lifetime of presigned upload URLs.
pub const PRESIGN_EXPIRY: Duration = Duration::from_secs(900);

#[derive(Debug, Clone)]
pub struct S3Store {
    client: aws_sdk_s3::Client,
    bucket: String,
    region: String,
}

impl S3Store {
    /// Build a client with static credentials from `settings`.
    pub async fn connect(settings: &S3Settings) -> Self {
        let credentials = Credentials::new(
            settings.access_key_id.clone(),
            settings.secret_access_key.clone(),
            None,
            None,
            "feedback-env",
        );
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()))
            .credentials_provider(credentials)
            .load()
            .await;

        Self {
            client: aws_sdk_s3::Client::new(&sdk_config),
            bucket: settings.bucket.clone(),
            region: settings.region.clone(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Virtual-hosted style object URL.
    pub fn file_url(&self, key: &str) -> String {
        format!("https://{}.s3.{}.amazonaws.com/{key}", self.bucket, self.region)
    }

    /// Presigned `PUT` URL for `key`, valid for [`PRESIGN_EXPIRY`].
    pub async fn presigned_put(&self, key: &str, content_type: &str) -> Result<String, StorageError> {
        let presign = PresigningConfig::expires_in(PRESIGN_EXPIRY)
            .map_err(|e| StorageError::S3(e.to_string()))?;

        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .presigned(presign)
            .await
            .map_err(|e| StorageError::S3(DisplayErrorContext(&e).to_string()))?;

        tracing::debug!(bucket = %self.bucket, key, "Generated presigned upload URL");
        Ok(request.uri().to_string())
    }

    /// Upload `bytes` to `key` and return the object URL.
    pub async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, StorageError> {
        let size = bytes.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| StorageError::S3(DisplayErrorContext(&e).to_string()))?;

        tracing::info!(bucket = %self.bucket, key, size, "Uploaded object to S3");
        Ok(self.file_url(key))
    }
}
