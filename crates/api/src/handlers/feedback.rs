//! Handlers for feedback ingestion and administration.
//!
//! Ingestion only writes the feedback row and its outbox job; every
//! notification happens later in the outbox worker.

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use feedback_core::error::CoreError;
use feedback_core::ingest::{dedup_key, resolve_page_url, validate_comment, ErrorDetails};
use feedback_core::pagination::{clamp_limit, clamp_page, parse_lenient, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use feedback_core::timestamps::{normalize_to_millis, stats_windows, TimestampInput};
use feedback_core::types::DbId;
use feedback_db::models::feedback::{CreateFeedback, FeedbackStats, FeedbackWithScreenshot};
use feedback_db::models::notification_job::NotificationHints;
use feedback_db::models::screenshot::{CreateScreenshotData, ScreenshotSummary};
use feedback_db::repositories::{FeedbackRepo, NotificationJobRepo, ScreenshotDataRepo};
use feedback_pipeline::NotificationContext;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::parse_db_id;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::authorize_power_user;
use crate::middleware::json::JsonBody;
use crate::state::AppState;

/// Outcome of a write that only reports success.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: &'static str,
}

impl MessageResponse {
    fn ok(message: &'static str) -> Json<Self> {
        Json(Self {
            success: true,
            message,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// POST /feedback
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitFeedbackRequest {
    pub comment: Option<String>,
    /// ScreenshotData id returned by `upload-screenshot-dom`.
    pub uploaded_data_id: Option<String>,
    pub timestamp: Option<TimestampInput>,
    pub user_agent: Option<String>,
    pub url: Option<String>,
    pub github_repository: Option<String>,
    pub error_details: Option<ErrorDetails>,
    pub user_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitFeedbackResponse {
    pub success: bool,
    pub id: DbId,
    pub message: &'static str,
    /// True when an identical recent submission was found and reused.
    pub duplicate: bool,
}

/// Look up the referenced capture. A malformed or unknown id is not an
/// error; the feedback is stored without a screenshot.
async fn resolve_screenshot(
    state: &AppState,
    uploaded_data_id: Option<&str>,
) -> AppResult<Option<ScreenshotSummary>> {
    let Some(raw) = uploaded_data_id.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    let Ok(id) = Uuid::parse_str(raw) else {
        tracing::warn!(uploaded_data_id = %raw, "Malformed screenshot id, storing feedback without screenshot");
        return Ok(None);
    };
    let summary = ScreenshotDataRepo::find_summary(&state.pool, id).await?;
    if summary.is_none() {
        tracing::warn!(screenshot_data_id = %id, "Screenshot data not found, storing feedback without screenshot");
    }
    Ok(summary)
}

/// Accept a feedback submission and queue its notifications.
pub async fn submit_feedback(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<SubmitFeedbackRequest>,
) -> AppResult<Json<SubmitFeedbackResponse>> {
    let comment = validate_comment(input.comment.as_deref())?.to_string();
    let screenshot = resolve_screenshot(&state, input.uploaded_data_id.as_deref()).await?;

    let request_url = non_blank(input.url);
    let user_name = non_blank(input.user_name);
    let resolved_url = resolve_page_url(
        request_url.as_deref(),
        screenshot.as_ref().map(|s| s.tab_url.as_str()),
        input.error_details.as_ref(),
    )
    .map(str::to_string);

    let timestamp = input
        .timestamp
        .as_ref()
        .and_then(normalize_to_millis)
        .unwrap_or_else(|| Utc::now().timestamp_millis());

    let screenshot_id = screenshot.as_ref().map(|s| s.id);
    let key = dedup_key(
        &comment,
        resolved_url.as_deref(),
        screenshot_id.map(|id| id.to_string()).as_deref(),
        user_name.as_deref(),
    );

    let create = CreateFeedback {
        comment,
        screenshot_data_id: screenshot_id,
        timestamp,
        user_agent: non_blank(input.user_agent),
        url: resolved_url,
        user_name: user_name.clone(),
    };
    let hints = NotificationHints {
        url: request_url,
        github_repository: non_blank(input.github_repository),
        error_details: input.error_details,
        user_name,
    };

    let outcome = NotificationJobRepo::enqueue_feedback(
        &state.pool,
        &create,
        &key,
        &hints,
        state.config.dedup_window_secs,
    )
    .await?;

    if outcome.duplicate {
        tracing::info!(feedback_id = outcome.feedback_id, "Duplicate feedback submission, reusing existing record");
    } else {
        state.worker_wake.notify_one();
        tracing::info!(
            feedback_id = outcome.feedback_id,
            job_id = outcome.job_id,
            has_screenshot = screenshot_id.is_some(),
            "Feedback received",
        );
    }

    Ok(Json(SubmitFeedbackResponse {
        success: true,
        id: outcome.feedback_id,
        message: "Feedback received",
        duplicate: outcome.duplicate,
    }))
}

// ---------------------------------------------------------------------------
// GET /feedback/list
// ---------------------------------------------------------------------------

/// Raw query values; unparsable numbers fall back to defaults.
#[derive(Debug, Deserialize)]
pub struct ListFeedbackParams {
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackListResponse {
    pub success: bool,
    pub feedbacks: Vec<FeedbackWithScreenshot>,
    pub count: usize,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
    pub stats: FeedbackStats,
}

/// Newest-first page of feedback plus dashboard counts.
pub async fn list_feedback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ListFeedbackParams>,
) -> AppResult<Json<FeedbackListResponse>> {
    if state.config.list_requires_power_user {
        authorize_power_user(&headers, &state.config.jwt)?;
    }

    let page = clamp_page(parse_lenient(params.page.as_deref()));
    let limit = clamp_limit(parse_lenient(params.limit.as_deref()), DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT);

    let result = FeedbackRepo::list_paginated(&state.pool, page, limit).await?;
    let (today_start, week_start) = stats_windows(Utc::now(), state.config.display_offset);
    let stats = FeedbackRepo::stats(&state.pool, today_start, week_start).await?;

    Ok(Json(FeedbackListResponse {
        success: true,
        count: result.feedbacks.len(),
        feedbacks: result.feedbacks,
        total: result.total,
        page: result.page,
        limit: result.limit,
        total_pages: result.total_pages,
        stats,
    }))
}

// ---------------------------------------------------------------------------
// GET /feedback/{id}
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    pub success: bool,
    pub feedback: FeedbackWithScreenshot,
}

pub async fn get_feedback(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> AppResult<Json<FeedbackResponse>> {
    let id = parse_db_id(&raw_id, "feedback")?;
    let feedback = FeedbackRepo::find_by_id_with_screenshot(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::not_found("Feedback", id)))?;

    Ok(Json(FeedbackResponse {
        success: true,
        feedback,
    }))
}

// ---------------------------------------------------------------------------
// PATCH /feedback/{id}
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct UpdateFeedbackRequest {
    /// A non-string value is rejected by the body extractor.
    pub comment: Option<String>,
}

pub async fn update_feedback(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    JsonBody(input): JsonBody<UpdateFeedbackRequest>,
) -> AppResult<Json<MessageResponse>> {
    let id = parse_db_id(&raw_id, "feedback")?;
    let comment = validate_comment(input.comment.as_deref())?;

    if !FeedbackRepo::update_comment(&state.pool, id, comment).await? {
        return Err(AppError::Core(CoreError::not_found("Feedback", id)));
    }

    tracing::info!(feedback_id = id, "Feedback comment updated");
    Ok(MessageResponse::ok("Feedback updated"))
}

// ---------------------------------------------------------------------------
// DELETE /feedback/{id}
// ---------------------------------------------------------------------------

/// Delete a feedback row. The referenced capture is left in place.
pub async fn delete_feedback(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let id = parse_db_id(&raw_id, "feedback")?;

    if !FeedbackRepo::delete(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::not_found("Feedback", id)));
    }

    tracing::info!(feedback_id = id, "Feedback deleted");
    Ok(MessageResponse::ok("Feedback deleted"))
}

// ---------------------------------------------------------------------------
// POST /feedback/{id}/create-task
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskResponse {
    pub success: bool,
    pub task_id: i64,
    pub task_url: String,
    pub message: &'static str,
}

/// Create a task for existing feedback, synchronously.
///
/// Reuses the request-time hints stored on the feedback's outbox job so the
/// task carries the same error details and repository as the automatic one.
pub async fn create_task(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> AppResult<Json<CreateTaskResponse>> {
    let id = parse_db_id(&raw_id, "feedback")?;

    if !state.pipeline.tasks_configured() {
        return Err(AppError::Core(CoreError::ServiceUnavailable(
            "Task server API key is not configured".into(),
        )));
    }

    let record = FeedbackRepo::find_by_id_with_screenshot(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::not_found("Feedback", id)))?;

    if record.screenshot_data.is_none() {
        let missing = record
            .feedback
            .screenshot_data_id
            .map(|sid| sid.to_string())
            .unwrap_or_else(|| "none".into());
        return Err(AppError::Core(CoreError::not_found_key("ScreenshotData", missing)));
    }

    let hints = NotificationJobRepo::find_by_feedback_id(&state.pool, id)
        .await?
        .map(|job| job.hints())
        .unwrap_or_default();
    let ctx = NotificationContext::new(record, hints);

    tracing::info!(feedback_id = id, "Manual task creation requested");
    let task = state.pipeline.create_task(&ctx, None).await.map_err(|e| {
        tracing::error!(feedback_id = id, error = %e, "Manual task creation failed");
        AppError::InternalError(e.to_string())
    })?;

    tracing::info!(feedback_id = id, task_id = task.task_id, "Task created");
    Ok(Json(CreateTaskResponse {
        success: true,
        task_id: task.task_id,
        task_url: task.task_url,
        message: "Task created",
    }))
}

// ---------------------------------------------------------------------------
// POST /feedback/upload-screenshot-dom
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadScreenshotDomRequest {
    /// PNG as a data URL or bare base64.
    pub screenshot: Option<String>,
    pub dom_tree: Option<String>,
    pub page_info: Option<serde_json::Value>,
    /// Capture time; seconds or milliseconds.
    pub timestamp: Option<TimestampInput>,
}

#[derive(Debug, Serialize)]
pub struct UploadScreenshotDomResponse {
    pub success: bool,
    pub id: Uuid,
    pub message: &'static str,
}

fn missing(field: &str) -> AppError {
    AppError::BadRequest(format!("Missing required field: {field}"))
}

/// Store a captured screenshot and its DOM snapshot.
pub async fn upload_screenshot_dom(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<UploadScreenshotDomRequest>,
) -> AppResult<Json<UploadScreenshotDomResponse>> {
    let screenshot = non_blank(input.screenshot).ok_or_else(|| missing("screenshot"))?;
    let dom_tree = input
        .dom_tree
        .filter(|d| !d.is_empty())
        .ok_or_else(|| missing("domTree"))?;
    let page_info = input.page_info.ok_or_else(|| missing("pageInfo"))?;
    let timestamp = input
        .timestamp
        .as_ref()
        .and_then(normalize_to_millis)
        .ok_or_else(|| missing("timestamp"))?;

    let tab_url = page_info
        .get("url")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| missing("pageInfo.url"))?
        .to_string();
    let tab_title = page_info
        .get("title")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    tracing::info!(
        tab_url = %tab_url,
        screenshot_len = screenshot.len(),
        dom_len = dom_tree.len(),
        "Screenshot upload started",
    );

    let stored = state.store.upload_screenshot(Utc::now(), &screenshot).await?;

    let id = ScreenshotDataRepo::insert(
        &state.pool,
        &CreateScreenshotData {
            screenshot_url: stored.file_url,
            dom_tree,
            tab_url,
            tab_title,
            timestamp,
            page_info: Some(page_info),
        },
    )
    .await?;

    tracing::info!(screenshot_data_id = %id, key = %stored.key, backend = state.store.backend_name(), "Screenshot data stored");
    Ok(Json(UploadScreenshotDomResponse {
        success: true,
        id,
        message: "Screenshot and DOM tree uploaded",
    }))
}
