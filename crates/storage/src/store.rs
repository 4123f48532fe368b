//! Backend selection and the operations the API uses.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use feedback_core::storage_key::{screenshot_key, upload_key};
use feedback_core::types::{DbId, Timestamp};
use serde::Serialize;

use crate::config::StorageConfig;
use crate::error::StorageError;
use crate::local::LocalStore;
use crate::s3::S3Store;

pub const PNG_CONTENT_TYPE: &str = "image/png";

/// Where an upload should be sent and where it will be readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedUpload {
    pub upload_url: String,
    pub key: String,
    pub file_url: String,
}

/// A stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredObject {
    pub key: String,
    pub file_url: String,
}

/// Decode a screenshot given as a `data:` URL or bare base64.
pub fn decode_image_data(data: &str) -> Result<Vec<u8>, StorageError> {
    let payload = match data.trim().strip_prefix("data:") {
        Some(rest) => rest
            .split_once(";base64,")
            .map(|(_, encoded)| encoded)
            .ok_or_else(|| StorageError::InvalidData("data URL is not base64 encoded".into()))?,
        None => data.trim(),
    };
    if payload.is_empty() {
        return Err(StorageError::InvalidData("empty image data".into()));
    }
    STANDARD
        .decode(payload)
        .map_err(|e| StorageError::InvalidData(e.to_string()))
}

/// S3 when configured, local disk otherwise. The local store is always
/// present because `PUT /api/uploads/local` writes to it directly.
#[derive(Debug, Clone)]
pub struct ObjectStore {
    local: LocalStore,
    s3: Option<S3Store>,
}

impl ObjectStore {
    pub async fn from_config(config: &StorageConfig) -> Self {
        let local = LocalStore::new(&config.uploads_dir, &config.public_base_url);
        let s3 = match &config.s3 {
            Some(settings) => {
                let store = S3Store::connect(settings).await;
                tracing::info!(bucket = %store.bucket(), region = %settings.region, "Using S3 storage");
                Some(store)
            }
            None => {
                tracing::warn!(
                    uploads_dir = %config.uploads_dir.display(),
                    "AWS S3 configuration incomplete, using local storage",
                );
                None
            }
        };
        Self { local, s3 }
    }

    pub fn local_only(local: LocalStore) -> Self {
        Self { local, s3: None }
    }

    pub fn local(&self) -> &LocalStore {
        &self.local
    }

    pub fn backend_name(&self) -> &'static str {
        if self.s3.is_some() {
            "s3"
        } else {
            "local"
        }
    }

    pub fn file_url(&self, key: &str) -> String {
        match &self.s3 {
            Some(s3) => s3.file_url(key),
            None => self.local.file_url(key),
        }
    }

    /// Upload target for a client-side PUT.
    pub async fn presign_upload(
        &self,
        now: Timestamp,
        file_name: &str,
        content_type: &str,
        feedback_id: Option<DbId>,
    ) -> Result<PresignedUpload, StorageError> {
        let key = upload_key(now, feedback_id, file_name);
        let upload_url = match &self.s3 {
            Some(s3) => s3.presigned_put(&key, content_type).await?,
            None => self.local.upload_url(file_name, content_type, &key),
        };
        Ok(PresignedUpload {
            upload_url,
            file_url: self.file_url(&key),
            key,
        })
    }

    pub async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, StorageError> {
        match &self.s3 {
            Some(s3) => s3.put(key, bytes, content_type).await,
            None => self.local.put(key, &bytes).await,
        }
    }

    /// Store a captured screenshot under the dated `screenshots/` prefix.
    pub async fn upload_screenshot(&self, now: Timestamp, data: &str) -> Result<StoredObject, StorageError> {
        let bytes = decode_image_data(data)?;
        let key = screenshot_key(now);
        let file_url = self.put(&key, bytes, PNG_CONTENT_TYPE).await?;
        Ok(StoredObject { key, file_url })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};

    use super::*;

    fn local_store(dir: &std::path::Path) -> ObjectStore {
        ObjectStore::local_only(LocalStore::new(dir, "http://localhost:3300"))
    }

    #[test]
    fn decodes_data_url_and_bare_base64() {
        assert_eq!(decode_image_data("data:image/png;base64,aGVsbG8=").unwrap(), b"hello");
        assert_eq!(decode_image_data("aGVsbG8=").unwrap(), b"hello");
        assert_matches!(decode_image_data("data:image/png,raw"), Err(StorageError::InvalidData(_)));
        assert_matches!(decode_image_data("!!!"), Err(StorageError::InvalidData(_)));
        assert_matches!(decode_image_data(""), Err(StorageError::InvalidData(_)));
    }

    #[tokio::test]
    async fn local_presign_points_at_upload_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let store = local_store(dir.path());
        let now = Utc.with_ymd_and_hms(2024, 12, 23, 8, 58, 5).unwrap();

        let upload = store.presign_upload(now, "shot.jpg", "image/jpeg", Some(7)).await.unwrap();

        assert!(upload.key.starts_with("feedbacks/2024/12/23/7_"));
        assert!(upload.key.ends_with(".jpg"));
        assert!(upload
            .upload_url
            .starts_with("http://localhost:3300/api/uploads/local?fileName=shot.jpg"));
        assert_eq!(upload.file_url, format!("http://localhost:3300/uploads/{}", upload.key));
        assert_eq!(store.backend_name(), "local");
    }

    #[tokio::test]
    async fn screenshot_is_written_under_dated_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let store = local_store(dir.path());
        let now = Utc.with_ymd_and_hms(2024, 12, 23, 8, 58, 5).unwrap();

        let stored = store
            .upload_screenshot(now, "data:image/png;base64,aGVsbG8=")
            .await
            .unwrap();

        assert!(stored.key.starts_with("screenshots/2024/12/23/screenshot_"));
        assert_eq!(std::fs::read(dir.path().join(&stored.key)).unwrap(), b"hello");
        assert!(stored.file_url.ends_with(&stored.key));
    }
}
