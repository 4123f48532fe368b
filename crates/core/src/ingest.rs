//! Request-independent rules of feedback ingestion: validation, page URL
//! resolution and the deduplication key.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::CoreError;

/// Placeholder shown when no page URL could be resolved.
pub const UNKNOWN_URL: &str = "Unknown URL";

/// Structured error report attached to feedback submitted by the extension
/// when a page fails. Unknown keys are preserved in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ErrorDetails {
    /// Additional properties beyond the four well-known fields.
    pub fn extra_json(&self) -> Option<String> {
        if self.extra.is_empty() {
            return None;
        }
        serde_json::to_string_pretty(&self.extra).ok()
    }
}

/// Require a non-blank comment.
pub fn validate_comment(comment: Option<&str>) -> Result<&str, CoreError> {
    match comment {
        Some(c) if !c.trim().is_empty() => Ok(c),
        _ => Err(CoreError::Validation("comment is required".into())),
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Resolve the page a feedback refers to.
///
/// Precedence: explicit request URL, then the screenshot's tab URL, then the
/// error report's page URL. Blank values are skipped.
pub fn resolve_page_url<'a>(
    request_url: Option<&'a str>,
    tab_url: Option<&'a str>,
    error_details: Option<&'a ErrorDetails>,
) -> Option<&'a str> {
    non_blank(request_url)
        .or_else(|| non_blank(tab_url))
        .or_else(|| non_blank(error_details.and_then(|d| d.page_url.as_deref())))
}

/// A resolved URL, or [`UNKNOWN_URL`].
pub fn url_or_placeholder(url: Option<&str>) -> &str {
    non_blank(url).unwrap_or(UNKNOWN_URL)
}

/// Identity of a submission for duplicate suppression.
///
/// Two submissions with the same comment, page, screenshot and reporter
/// produce the same key.
pub fn dedup_key(
    comment: &str,
    url: Option<&str>,
    screenshot_id: Option<&str>,
    user_name: Option<&str>,
) -> String {
    let mut hasher = Sha256::new();
    for part in [Some(comment.trim()), non_blank(url), non_blank(screenshot_id), non_blank(user_name)] {
        match part {
            Some(value) => {
                hasher.update([1u8]);
                hasher.update((value.len() as u64).to_be_bytes());
                hasher.update(value.as_bytes());
            }
            None => hasher.update([0u8]),
        }
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn blank_comment_is_rejected() {
        assert_matches!(validate_comment(None), Err(CoreError::Validation(_)));
        assert_matches!(validate_comment(Some("")), Err(CoreError::Validation(_)));
        assert_matches!(validate_comment(Some("  \n")), Err(CoreError::Validation(_)));
        assert_eq!(validate_comment(Some("broken button")).unwrap(), "broken button");
    }

    #[test]
    fn url_precedence() {
        let details = ErrorDetails {
            page_url: Some("https://from-error.example".into()),
            ..Default::default()
        };
        assert_eq!(
            resolve_page_url(Some("https://req.example"), Some("https://tab.example"), Some(&details)),
            Some("https://req.example")
        );
        assert_eq!(
            resolve_page_url(Some(" "), Some("https://tab.example"), Some(&details)),
            Some("https://tab.example")
        );
        assert_eq!(
            resolve_page_url(None, None, Some(&details)),
            Some("https://from-error.example")
        );
        assert_eq!(resolve_page_url(None, None, None), None);
        assert_eq!(url_or_placeholder(None), UNKNOWN_URL);
    }

    #[test]
    fn error_details_keep_unknown_fields() {
        let json = serde_json::json!({
            "source": "window.onerror",
            "pageUrl": "https://a.example",
            "stack": "at foo",
            "lineNumber": 12
        });
        let details: ErrorDetails = serde_json::from_value(json).unwrap();
        assert_eq!(details.page_url.as_deref(), Some("https://a.example"));
        assert_eq!(details.extra.get("lineNumber"), Some(&serde_json::json!(12)));
        assert!(details.extra_json().unwrap().contains("lineNumber"));
    }

    #[test]
    fn dedup_key_is_stable_and_field_sensitive() {
        let a = dedup_key("same", Some("https://x"), None, Some("kim"));
        assert_eq!(a, dedup_key("same", Some("https://x"), None, Some("kim")));
        assert_eq!(a.len(), 64);
        assert_ne!(a, dedup_key("same", Some("https://x"), None, None));
        assert_ne!(a, dedup_key("same", None, Some("https://x"), Some("kim")));
        assert_ne!(a, dedup_key("other", Some("https://x"), None, Some("kim")));
    }
}
