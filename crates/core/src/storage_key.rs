//! Object key scheme for uploaded screenshots and files.
//!
//! Keys are shared between S3 and the local-disk fallback, so the same key
//! addresses the same asset in either backend.

use chrono::Datelike;

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Extension used when a file name carries none.
pub const DEFAULT_EXTENSION: &str = "png";

/// Extension of `file_name` (text after the last dot), or `png`.
pub fn file_extension(file_name: &str) -> &str {
    match file_name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() && !ext.contains('/') => ext,
        _ => DEFAULT_EXTENSION,
    }
}

fn date_prefix(root: &str, now: Timestamp) -> String {
    format!("{root}/{}/{:02}/{:02}", now.year(), now.month(), now.day())
}

/// Key for a client upload.
///
/// `feedbacks/{y}/{m}/{d}/{feedbackId}_{ms}.{ext}` when the feedback is
/// known, `temp/{ms}.{ext}` otherwise.
pub fn upload_key(now: Timestamp, feedback_id: Option<DbId>, file_name: &str) -> String {
    let ext = file_extension(file_name);
    let millis = now.timestamp_millis();
    match feedback_id {
        Some(id) => format!("{}/{id}_{millis}.{ext}", date_prefix("feedbacks", now)),
        None => format!("temp/{millis}.{ext}"),
    }
}

/// Key for a screenshot captured alongside a DOM snapshot.
pub fn screenshot_key(now: Timestamp) -> String {
    format!(
        "{}/screenshot_{}.png",
        date_prefix("screenshots", now),
        now.timestamp_millis()
    )
}

/// Reject keys that could escape the uploads directory.
pub fn validate_local_key(key: &str) -> Result<(), CoreError> {
    if key.is_empty() {
        return Err(CoreError::Validation("File key must not be empty".into()));
    }
    if key.contains("..") || key.contains('\\') || key.starts_with('/') {
        return Err(CoreError::Validation(format!("Invalid file path: {key}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};

    use super::*;

    fn at() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 7, 12, 0, 0).unwrap()
    }

    #[test]
    fn extension_defaults_to_png() {
        assert_eq!(file_extension("shot.jpeg"), "jpeg");
        assert_eq!(file_extension("archive.tar.gz"), "gz");
        assert_eq!(file_extension("noext"), "png");
        assert_eq!(file_extension("trailing."), "png");
    }

    #[test]
    fn keys_with_feedback_id_are_dated() {
        let key = upload_key(at(), Some(42), "shot.png");
        assert_eq!(key, format!("feedbacks/2024/03/07/42_{}.png", at().timestamp_millis()));
    }

    #[test]
    fn keys_without_feedback_id_go_to_temp() {
        let key = upload_key(at(), None, "shot.webp");
        assert_eq!(key, format!("temp/{}.webp", at().timestamp_millis()));
    }

    #[test]
    fn screenshot_keys_are_dated() {
        assert!(screenshot_key(at()).starts_with("screenshots/2024/03/07/screenshot_"));
    }

    #[test]
    fn traversal_attempts_are_rejected() {
        assert_matches!(validate_local_key("../etc/passwd"), Err(CoreError::Validation(_)));
        assert_matches!(validate_local_key("temp/..\\x"), Err(CoreError::Validation(_)));
        assert_matches!(validate_local_key("temp\\x.png"), Err(CoreError::Validation(_)));
        assert_matches!(validate_local_key("/abs.png"), Err(CoreError::Validation(_)));
        assert_matches!(validate_local_key(""), Err(CoreError::Validation(_)));
        assert!(validate_local_key("temp/1.png").is_ok());
    }
}
