//! Object storage for screenshots and client uploads.
//!
//! [`ObjectStore`] targets S3 when AWS credentials are configured and falls
//! back to a local directory served under `/uploads` otherwise. Keys follow
//! the same scheme on both backends.

pub mod config;
pub mod error;
pub mod local;
pub mod s3;
pub mod store;

pub use config::StorageConfig;
pub use error::StorageError;
pub use local::LocalStore;
pub use store::{ObjectStore, PresignedUpload, StoredObject};
