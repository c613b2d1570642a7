//! HS256 bearer token authentication.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use tubely_models::UserId;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Issuer of access tokens.
pub const TOKEN_ISSUER: &str = "tubely-access";

/// Decoded access token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    /// Issuer
    pub iss: String,
    /// Issued at
    pub iat: i64,
    /// Expiration
    pub exp: i64,
}

/// Verification key derived from the shared secret.
///
/// Tokens are issued elsewhere; this service only verifies them.
#[derive(Clone)]
pub struct JwtKeys {
    decoding: DecodingKey,
}

impl JwtKeys {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            decoding: DecodingKey::from_secret(secret),
        }
    }

    /// Verify an access token and return its subject.
    pub fn verify(&self, token: &str) -> ApiResult<UserId> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[TOKEN_ISSUER]);

        let token_data = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|e| ApiError::unauthorized(format!("Couldn't validate JWT: {}", e)))?;

        token_data
            .claims
            .sub
            .parse()
            .map_err(|_| ApiError::unauthorized("Invalid user ID in token"))
    }
}

/// Authenticated user extracted from request.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: UserId,
}

/// Axum extractor for authenticated user.
#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Couldn't find JWT"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::unauthorized("Invalid Authorization header format"))?;

        let user_id = state.jwt.verify(token)?;
        debug!(user_id = %user_id, "Authenticated request");

        Ok(AuthUser { user_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use uuid::Uuid;

    fn token(secret: &[u8], sub: &str, iss: &str, ttl_secs: i64) -> String {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: sub.to_string(),
            iss: iss.to_string(),
            iat: now,
            exp: now + ttl_secs,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret),
        )
        .unwrap()
    }

    #[test]
    fn test_verify_valid_token() {
        let keys = JwtKeys::new(b"test-secret");
        let user = UserId(Uuid::new_v4());
        let token = token(b"test-secret", &user.to_string(), TOKEN_ISSUER, 60);
        assert_eq!(keys.verify(&token).unwrap(), user);
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let keys = JwtKeys::new(b"test-secret");
        let token = token(b"test-secret", &Uuid::new_v4().to_string(), "someone-else", 60);
        assert!(matches!(keys.verify(&token), Err(ApiError::Unauthorized(_))));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = token(b"one", &Uuid::new_v4().to_string(), TOKEN_ISSUER, 60);
        assert!(matches!(
            JwtKeys::new(b"two").verify(&token),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let keys = JwtKeys::new(b"test-secret");
        let token = token(b"test-secret", &Uuid::new_v4().to_string(), TOKEN_ISSUER, -3600);
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn test_non_uuid_subject_rejected() {
        let keys = JwtKeys::new(b"test-secret");
        let token = token(b"test-secret", "not-a-uuid", TOKEN_ISSUER, 60);
        assert!(matches!(keys.verify(&token), Err(ApiError::Unauthorized(_))));
    }
}
