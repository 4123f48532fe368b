//! Power-user authorization for elevated routes.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use feedback_core::error::CoreError;
use feedback_core::roles::is_power_user;

use crate::auth::jwt::{validate_token, JwtConfig};
use crate::error::AppError;
use crate::state::AppState;

/// A caller whose bearer token carries the `POWER_USER` or `ADMIN` role.
///
/// Every failure (missing header, bad token, unconfigured secret, ordinary
/// role) is a 403.
///
/// ```ignore
/// async fn list_logs(_: PowerUser, State(state): State<AppState>) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct PowerUser {
    pub subject: String,
    pub role: String,
}

fn forbidden(detail: &str) -> AppError {
    AppError::Core(CoreError::Forbidden(format!(
        "Power user role required: {detail}"
    )))
}

/// Check the `Authorization` header against the power-user role.
pub fn authorize_power_user(headers: &HeaderMap, config: &JwtConfig) -> Result<PowerUser, AppError> {
    let header = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| forbidden("missing Authorization header"))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| forbidden("expected Bearer token"))?;

    let claims = validate_token(token.trim(), config).map_err(|e| {
        tracing::debug!(error = %e, "Rejected bearer token");
        forbidden("invalid or expired token")
    })?;

    if !is_power_user(claims.role.as_deref()) {
        return Err(forbidden("insufficient role"));
    }

    Ok(PowerUser {
        subject: claims.sub,
        role: claims.role.unwrap_or_default(),
    })
}

impl FromRequestParts<AppState> for PowerUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authorize_power_user(&parts.headers, &state.config.jwt)
    }
}
