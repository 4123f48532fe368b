//! Storage configuration loaded from the environment.

use std::path::PathBuf;

use feedback_core::settings::{credential_from_env, string_from_env};

pub const DEFAULT_UPLOADS_DIR: &str = "public/uploads";
pub const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:3300";

/// Credentials and bucket for the S3 backend.
#[derive(Debug, Clone)]
pub struct S3Settings {
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket: String,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// `None` selects local-disk storage.
    pub s3: Option<S3Settings>,
    /// Directory backing `/uploads`.
    pub uploads_dir: PathBuf,
    /// Origin used to build local upload and file URLs.
    pub public_base_url: String,
}

impl StorageConfig {
    /// Load configuration from environment variables.
    ///
    /// S3 is used only when all four AWS variables hold real values;
    /// otherwise files go to `UPLOADS_DIR`.
    ///
    /// | Variable                | Default                 |
    /// |-------------------------|-------------------------|
    /// | `AWS_REGION`            | none                    |
    /// | `AWS_ACCESS_KEY_ID`     | none                    |
    /// | `AWS_SECRET_ACCESS_KEY` | none                    |
    /// | `AWS_S3_BUCKET_NAME`    | none                    |
    /// | `UPLOADS_DIR`           | `public/uploads`        |
    /// | `PUBLIC_BASE_URL`       | `http://localhost:3300` |
    pub fn from_env() -> Self {
        let s3 = match (
            credential_from_env("AWS_REGION"),
            credential_from_env("AWS_ACCESS_KEY_ID"),
            credential_from_env("AWS_SECRET_ACCESS_KEY"),
            credential_from_env("AWS_S3_BUCKET_NAME"),
        ) {
            (Some(region), Some(access_key_id), Some(secret_access_key), Some(bucket)) => {
                Some(S3Settings {
                    region,
                    access_key_id,
                    secret_access_key,
                    bucket,
                })
            }
            _ => None,
        };

        Self {
            s3,
            uploads_dir: PathBuf::from(string_from_env("UPLOADS_DIR", DEFAULT_UPLOADS_DIR)),
            public_base_url: string_from_env("PUBLIC_BASE_URL", DEFAULT_PUBLIC_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
        }
    }

    /// Local storage rooted at `uploads_dir`.
    pub fn local(uploads_dir: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            s3: None,
            uploads_dir: uploads_dir.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }
}
