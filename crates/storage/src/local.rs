//! Local-disk backend used when S3 is not configured.
//!
//! Files live under the uploads directory at their object key and are
//! served by the API at `/uploads/{key}`.

use std::path::{Path, PathBuf};

use feedback_core::storage_key::validate_local_key;
use url::form_urlencoded;

use crate::error::StorageError;

#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn file_url(&self, key: &str) -> String {
        format!("{}/uploads/{key}", self.public_base_url)
    }

    /// URL the client PUTs the file body to.
    pub fn upload_url(&self, file_name: &str, file_type: &str, key: &str) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("fileName", file_name)
            .append_pair("fileType", file_type)
            .append_pair("key", key)
            .finish();
        format!("{}/api/uploads/local?{query}", self.public_base_url)
    }

    /// Write `bytes` at `key`, creating parent directories. Returns the
    /// public file URL.
    ///
    /// The key is validated before anything touches the file system.
    pub async fn put(&self, key: &str, bytes: &[u8]) -> Result<String, StorageError> {
        validate_local_key(key)?;

        let path = self.root.join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;

        tracing::info!(key, size = bytes.len(), path = %path.display(), "Stored file locally");
        Ok(self.file_url(key))
    }
}
