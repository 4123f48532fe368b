//! Handlers for stored captures and their draft comments.

use axum::extract::{Path, State};
use axum::Json;
use feedback_core::error::CoreError;
use feedback_core::types::Timestamp;
use feedback_db::models::screenshot::ScreenshotSummary;
use feedback_db::repositories::ScreenshotDataRepo;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::json::JsonBody;
use crate::state::AppState;

/// A malformed id cannot name an existing capture, so it is a 404 like any
/// other unknown id.
fn parse_screenshot_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::Core(CoreError::not_found_key("ScreenshotData", raw)))
}

fn not_found(id: Uuid) -> AppError {
    AppError::Core(CoreError::not_found_key("ScreenshotData", id.to_string()))
}

// ---------------------------------------------------------------------------
// GET /screenshot/{id}
// ---------------------------------------------------------------------------

/// Capture metadata without the DOM. `tempComment` is `""` when unset.
pub async fn get_screenshot(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> AppResult<Json<ScreenshotSummary>> {
    let id = parse_screenshot_id(&raw_id)?;
    let mut summary = ScreenshotDataRepo::find_summary(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    summary.temp_comment.get_or_insert_with(String::new);
    Ok(Json(summary))
}

// ---------------------------------------------------------------------------
// GET/POST /screenshot/{id}/temp-comment
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TempCommentResponse {
    pub id: Uuid,
    pub temp_comment: String,
}

pub async fn get_temp_comment(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> AppResult<Json<TempCommentResponse>> {
    let id = parse_screenshot_id(&raw_id)?;
    let row = ScreenshotDataRepo::find_temp_comment(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;

    Ok(Json(TempCommentResponse {
        id: row.id,
        temp_comment: row.temp_comment.unwrap_or_default(),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveTempCommentRequest {
    pub temp_comment: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedTempCommentResponse {
    pub id: Uuid,
    pub temp_comment: String,
    pub updated_at: Timestamp,
    pub message: &'static str,
}

/// Replace the draft comment; an empty string clears it.
pub async fn save_temp_comment(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    JsonBody(input): JsonBody<SaveTempCommentRequest>,
) -> AppResult<Json<SavedTempCommentResponse>> {
    let id = parse_screenshot_id(&raw_id)?;
    let temp_comment = input
        .temp_comment
        .ok_or_else(|| AppError::BadRequest("tempComment must be a string".into()))?;

    let row = ScreenshotDataRepo::update_temp_comment(&state.pool, id, &temp_comment)
        .await?
        .ok_or_else(|| not_found(id))?;

    tracing::debug!(screenshot_data_id = %id, cleared = row.temp_comment.is_none(), "Draft comment saved");
    Ok(Json(SavedTempCommentResponse {
        id: row.id,
        temp_comment: row.temp_comment.unwrap_or_default(),
        updated_at: row.updated_at,
        message: "Draft comment saved",
    }))
}
