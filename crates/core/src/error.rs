use crate::types::DbId;

/// Label used whenever a failure carries no message of its own.
pub const UNKNOWN_ERROR: &str = "Unknown error";

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Not-found error for a numeric feedback-style id.
    pub fn not_found(entity: &'static str, id: DbId) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Not-found error for an opaque string id (screenshot data).
    pub fn not_found_key(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}

/// Normalise an optional error message, substituting [`UNKNOWN_ERROR`]
/// for missing or blank values.
pub fn message_or_unknown(message: Option<&str>) -> String {
    match message.map(str::trim) {
        Some(m) if !m.is_empty() => m.to_string(),
        _ => UNKNOWN_ERROR.to_string(),
    }
}
