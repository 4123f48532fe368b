use feedback_core::error::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The object key failed validation (path traversal and the like).
    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    /// The uploaded payload could not be decoded.
    #[error("Invalid upload data: {0}")]
    InvalidData(String),

    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),

    #[error("S3 error: {0}")]
    S3(String),
}

impl From<CoreError> for StorageError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(msg) => Self::InvalidKey(msg),
            other => Self::InvalidKey(other.to_string()),
        }
    }
}
