//! Feedback entity models and DTOs.

use feedback_core::types::{DbId, EpochMillis, EpochSeconds, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::screenshot::ScreenshotData;

/// A row from the `feedback` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: DbId,
    pub comment: String,
    pub screenshot_data_id: Option<Uuid>,
    pub timestamp: EpochSeconds,
    pub user_agent: Option<String>,
    pub url: Option<String>,
    pub user_name: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Feedback joined with its (decoded) screenshot capture, if any.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackWithScreenshot {
    #[serde(flatten)]
    pub feedback: Feedback,
    pub screenshot_data: Option<ScreenshotData>,
}

/// DTO for inserting feedback.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFeedback {
    pub comment: String,
    pub screenshot_data_id: Option<Uuid>,
    /// Submission time in milliseconds; stored floored to seconds.
    pub timestamp: EpochMillis,
    pub user_agent: Option<String>,
    pub url: Option<String>,
    pub user_name: Option<String>,
}

/// One page of feedback, newest first.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackPage {
    pub feedbacks: Vec<FeedbackWithScreenshot>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

/// Counts shown on the admin dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackStats {
    pub total: i64,
    pub today: i64,
    pub this_week: i64,
}
