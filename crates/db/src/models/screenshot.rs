//! Screenshot capture models.

use feedback_core::types::{EpochMillis, EpochSeconds, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A row from the `screenshot_data` table.
///
/// `dom_tree` holds decoded markup once it has passed through
/// [`crate::repositories::ScreenshotDataRepo`].
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotData {
    pub id: Uuid,
    pub screenshot_url: String,
    pub dom_tree: String,
    pub tab_url: String,
    pub tab_title: String,
    pub timestamp: EpochSeconds,
    pub page_info: Option<serde_json::Value>,
    pub temp_comment: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Screenshot metadata without the DOM payload.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotSummary {
    pub id: Uuid,
    pub screenshot_url: String,
    pub tab_url: String,
    pub tab_title: String,
    pub timestamp: EpochSeconds,
    pub page_info: Option<serde_json::Value>,
    pub temp_comment: Option<String>,
    pub created_at: Timestamp,
}

/// DTO for storing a new capture.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateScreenshotData {
    pub screenshot_url: String,
    pub dom_tree: String,
    pub tab_url: String,
    pub tab_title: String,
    /// Capture time in milliseconds; stored floored to seconds.
    pub timestamp: EpochMillis,
    pub page_info: Option<serde_json::Value>,
}

/// Result of a temp-comment write.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TempComment {
    pub id: Uuid,
    pub temp_comment: Option<String>,
    pub updated_at: Timestamp,
}
