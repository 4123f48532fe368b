//! Bearer-token verification.
//!
//! Tokens are issued by the external auth service and signed HS256 with a
//! shared secret. This service only verifies them and reads the role claim.

use feedback_core::settings::credential_from_env;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Claims read from an access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject, opaque to this service.
    pub sub: String,
    /// Role name, e.g. `POWER_USER`.
    #[serde(default)]
    pub role: Option<String>,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
}

#[derive(Debug, Clone, Default)]
pub struct JwtConfig {
    /// HMAC-SHA256 secret. `None` means no token can be verified.
    pub secret: Option<String>,
}

impl JwtConfig {
    /// | Env Var           | Default |
    /// |-------------------|---------|
    /// | `AUTH_JWT_SECRET` | none    |
    pub fn from_env() -> Self {
        Self {
            secret: credential_from_env("AUTH_JWT_SECRET"),
        }
    }

    pub fn with_secret(secret: &str) -> Self {
        Self {
            secret: Some(secret.to_string()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token verification is not configured")]
    NotConfigured,
    #[error(transparent)]
    Invalid(#[from] jsonwebtoken::errors::Error),
}

/// Validate signature and expiry, returning the embedded [`Claims`].
pub fn validate_token(token: &str, config: &JwtConfig) -> Result<Claims, TokenError> {
    let secret = config.secret.as_deref().ok_or(TokenError::NotConfigured)?;
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use jsonwebtoken::{encode, EncodingKey, Header};

    use super::*;

    const SECRET: &str = "test-secret-that-is-long-enough-for-hmac";

    fn token(role: Option<&str>, exp_offset: i64, secret: &str) -> String {
        let claims = Claims {
            sub: "user-1".into(),
            role: role.map(str::to_string),
            exp: chrono::Utc::now().timestamp() + exp_offset,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[test]
    fn valid_token_yields_role() {
        let claims = validate_token(&token(Some("POWER_USER"), 600, SECRET), &JwtConfig::with_secret(SECRET))
            .unwrap();
        assert_eq!(claims.role.as_deref(), Some("POWER_USER"));
        assert_eq!(claims.sub, "user-1");
    }

    #[test]
    fn expired_token_fails() {
        let result = validate_token(&token(Some("ADMIN"), -600, SECRET), &JwtConfig::with_secret(SECRET));
        assert_matches!(result, Err(TokenError::Invalid(_)));
    }

    #[test]
    fn wrong_secret_fails() {
        let result = validate_token(
            &token(Some("ADMIN"), 600, "another-secret-of-sufficient-length"),
            &JwtConfig::with_secret(SECRET),
        );
        assert_matches!(result, Err(TokenError::Invalid(_)));
    }

    #[test]
    fn missing_secret_rejects_everything() {
        let result = validate_token(&token(Some("ADMIN"), 600, SECRET), &JwtConfig::default());
        assert_matches!(result, Err(TokenError::NotConfigured));
    }
}
