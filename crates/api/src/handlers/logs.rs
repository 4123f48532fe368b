//! Handlers for the in-memory client error log.

use std::str::FromStr;

use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use feedback_core::error_log::{ErrorLogEntry, ErrorLogFilter, LogLevel, LogSource, NewErrorLog, DEFAULT_QUERY_LIMIT};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::PowerUser;
use crate::middleware::json::JsonBody;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// POST /logs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLogRequest {
    pub source: Option<String>,
    pub level: Option<String>,
    pub message: Option<String>,
    pub details: Option<serde_json::Value>,
    pub url: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateLogResponse {
    pub success: bool,
    pub id: String,
    pub message: &'static str,
}

fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, AppError> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("Missing required field: {field}")))
}

/// Record a client-reported error and mirror it into the server log.
pub async fn create_log(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<CreateLogRequest>,
) -> AppResult<Json<CreateLogResponse>> {
    let source: LogSource = required(&input.source, "source")?.parse()?;
    let level: LogLevel = required(&input.level, "level")?.parse()?;
    let message = required(&input.message, "message")?.to_string();

    match level {
        LogLevel::Error => {
            tracing::error!(source = %source, message = %message, details = ?input.details, "Client error reported")
        }
        LogLevel::Warning => {
            tracing::warn!(source = %source, message = %message, details = ?input.details, "Client warning reported")
        }
        LogLevel::Info => {
            tracing::info!(source = %source, message = %message, details = ?input.details, "Client log reported")
        }
    }

    let id = state.error_logs().push(
        NewErrorLog {
            source,
            level,
            message,
            details: input.details,
            url: input.url,
            user_agent: input.user_agent,
        },
        Utc::now().timestamp_millis(),
    )?;

    Ok(Json(CreateLogResponse {
        success: true,
        id,
        message: "Log recorded",
    }))
}

// ---------------------------------------------------------------------------
// GET /logs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ListLogsParams {
    pub limit: Option<String>,
    pub source: Option<String>,
    pub level: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListLogsResponse {
    pub success: bool,
    pub logs: Vec<ErrorLogEntry>,
    pub total_count: usize,
    pub limit: usize,
}

/// Parse an optional filter value. `None` means the value is not a known
/// variant, so nothing can match it.
fn filter_value<T: FromStr>(raw: Option<&str>) -> Option<Option<T>> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Some(None),
        Some(value) => value.parse().ok().map(Some),
    }
}

/// Newest-first log entries. Requires the power-user role.
///
/// An unknown `source` or `level` filter yields an empty list.
pub async fn list_logs(
    _user: PowerUser,
    State(state): State<AppState>,
    Query(params): Query<ListLogsParams>,
) -> AppResult<Json<ListLogsResponse>> {
    let limit = params
        .limit
        .as_deref()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_QUERY_LIMIT);

    let (Some(source), Some(level)) = (
        filter_value::<LogSource>(params.source.as_deref()),
        filter_value::<LogLevel>(params.level.as_deref()),
    ) else {
        tracing::debug!(source = ?params.source, level = ?params.level, "Unknown log filter, nothing matches");
        return Ok(Json(ListLogsResponse {
            success: true,
            logs: Vec::new(),
            total_count: 0,
            limit,
        }));
    };
    let filter = ErrorLogFilter { source, level, limit };

    let page = state.error_logs().query(&filter);

    Ok(Json(ListLogsResponse {
        success: true,
        logs: page.logs,
        total_count: page.total_count,
        limit,
    }))
}
