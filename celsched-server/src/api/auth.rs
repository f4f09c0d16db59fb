//! Bearer token authentication
//!
//! Tokens are HS256 JWTs signed with the configured secret. `require_auth`
//! validates the token and stores its [`Claims`] in the request extensions;
//! `require_admin` runs after it and checks the access level.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::error::ApiError;
use crate::AppState;

pub const ACCESS_LEVEL_ADMIN: i32 = 1;
pub const ACCESS_LEVEL_DEPARTMENT_HEAD: i32 = 2;
pub const ACCESS_LEVEL_VOLUNTEER: i32 = 3;

/// Issuer written into every token this service signs
pub const TOKEN_ISSUER: &str = "cel-scheduling-system";

/// Token payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    #[serde(alias = "sub")]
    pub user_id: String,
    pub username: String,
    pub access_level: i32,
    /// Expiry, seconds since the Unix epoch
    pub exp: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

impl Claims {
    /// Claims expiring `lifetime_secs` from now
    pub fn new(
        user_id: impl Into<String>,
        username: impl Into<String>,
        access_level: i32,
        lifetime_secs: i64,
    ) -> Self {
        let exp = (Utc::now().timestamp() + lifetime_secs).max(0) as usize;
        Self {
            user_id: user_id.into(),
            username: username.into(),
            access_level,
            exp,
            iss: Some(TOKEN_ISSUER.to_string()),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.access_level == ACCESS_LEVEL_ADMIN
    }
}

/// Signing and verification keys derived from the shared secret
#[derive(Clone)]
pub struct JwtKeys {
    encoding: Arc<EncodingKey>,
    decoding: Arc<DecodingKey>,
}

impl JwtKeys {
    pub fn from_secret(secret: &str) -> Self {
        Self {
            encoding: Arc::new(EncodingKey::from_secret(secret.as_bytes())),
            decoding: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
        }
    }

    pub fn issue(&self, claims: &Claims) -> jsonwebtoken::errors::Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
    }

    /// Verify signature and expiry
    pub fn verify(&self, token: &str) -> jsonwebtoken::errors::Result<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding, &validation).map(|data| data.claims)
    }
}

/// Reject requests without a valid bearer token
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Authorization header required".to_string()))?;

    let token = header.strip_prefix("Bearer ").ok_or_else(|| {
        ApiError::Unauthorized(
            "Invalid authorization format. Expected 'Bearer {token}'".to_string(),
        )
    })?;

    let claims = state.jwt.verify(token.trim()).map_err(|e| {
        debug!(error = %e, "Token rejected");
        ApiError::Unauthorized("Invalid or expired token".to_string())
    })?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Reject authenticated callers who are not admins
///
/// Must be layered inside [`require_auth`].
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let claims = request
        .extensions()
        .get::<Claims>()
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;

    if !claims.is_admin() {
        return Err(ApiError::Forbidden("Admin access required".to_string()));
    }

    Ok(next.run(request).await)
}
