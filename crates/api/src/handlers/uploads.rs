//! Client-side upload support: presigned URLs and the local-disk target
//! those URLs point at when S3 is not configured.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use feedback_core::storage_key::validate_local_key;
use feedback_core::types::DbId;
use feedback_storage::PresignedUpload;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::json::JsonBody;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// PUT /uploads/local
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalUploadParams {
    pub file_name: Option<String>,
    pub file_type: Option<String>,
    pub key: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalUploadResponse {
    pub success: bool,
    pub key: String,
    pub file_url: String,
    pub message: &'static str,
}

/// Write the raw request body under `key` in the uploads directory.
///
/// Keys containing `..`, `\` or a leading `/` are rejected before anything
/// touches the disk.
pub async fn upload_local(
    State(state): State<AppState>,
    Query(params): Query<LocalUploadParams>,
    body: Bytes,
) -> AppResult<Json<LocalUploadResponse>> {
    let key = params
        .key
        .filter(|k| !k.is_empty())
        .unwrap_or_else(|| format!("temp/{}.png", Utc::now().timestamp_millis()));
    validate_local_key(&key).inspect_err(|_| {
        tracing::warn!(key = %key, "Rejected local upload key");
    })?;

    tracing::info!(
        key = %key,
        file_name = params.file_name.as_deref().unwrap_or_default(),
        file_type = params.file_type.as_deref().unwrap_or("image/png"),
        size = body.len(),
        "Local upload received",
    );

    let file_url = state.store.local().put(&key, &body).await?;

    Ok(Json(LocalUploadResponse {
        success: true,
        key,
        file_url,
        message: "File saved locally",
    }))
}

// ---------------------------------------------------------------------------
// POST /s3/presigned-url
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignRequest {
    pub file_name: Option<String>,
    #[serde(alias = "contentType")]
    pub file_type: Option<String>,
    pub feedback_id: Option<DbId>,
}

#[derive(Debug, Serialize)]
pub struct PresignResponse {
    pub success: bool,
    #[serde(flatten)]
    pub upload: PresignedUpload,
}

/// Where the client should PUT a file, and where it will be readable.
pub async fn presigned_url(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<PresignRequest>,
) -> AppResult<Json<PresignResponse>> {
    let (Some(file_name), Some(file_type)) = (
        input.file_name.filter(|v| !v.trim().is_empty()),
        input.file_type.filter(|v| !v.trim().is_empty()),
    ) else {
        return Err(AppError::BadRequest("fileName and fileType are required".into()));
    };

    let upload = state
        .store
        .presign_upload(Utc::now(), &file_name, &file_type, input.feedback_id)
        .await?;

    tracing::info!(key = %upload.key, backend = state.store.backend_name(), "Upload URL issued");
    Ok(Json(PresignResponse {
        success: true,
        upload,
    }))
}
