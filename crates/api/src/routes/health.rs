use axum::extract::State;
use axum::http::StatusCode;
use axum::{routing::get, Json, Router};
use feedback_core::types::Timestamp;
use serde::Serialize;

use crate::state::AppState;

pub const SERVICE_NAME: &str = "feedback-suite";

/// Health check response payload.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// `healthy` or `unhealthy`.
    pub status: &'static str,
    pub timestamp: Timestamp,
    pub service: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Whether the database is reachable.
    pub db_healthy: bool,
    /// `s3` or `local`.
    pub storage: &'static str,
}

/// GET /health -- 200 when the database answers, 503 otherwise.
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let db_healthy = match feedback_db::health_check(&state.pool).await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            false
        }
    };

    let (status_code, status) = if db_healthy {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };

    (
        status_code,
        Json(HealthResponse {
            status,
            timestamp: chrono::Utc::now(),
            service: SERVICE_NAME,
            version: env!("CARGO_PKG_VERSION"),
            db_healthy,
            storage: state.store.backend_name(),
        }),
    )
}

/// Mount health check routes (intended for root-level, NOT under `/api`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
