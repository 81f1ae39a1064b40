//! Token issuance and bearer-token request extraction

use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::request::Parts,
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use larder_common::auth;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// POST /auth/token
///
/// Exchanges a username/password pair for an opaque bearer token.
/// Bad credentials always map to 401 without distinguishing unknown
/// users from wrong passwords.
pub async fn issue_token(
    State(state): State<AppState>,
    Json(request): Json<TokenRequest>,
) -> ApiResult<Json<TokenResponse>> {
    auth::authenticate_user(&state.db, &request.username, &request.password)
        .await
        .map_err(|_| ApiError::Unauthorized("Invalid username or password".to_string()))?;

    let issued = auth::issue_token(&state.db, &request.username, state.config.token_ttl_minutes)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    // Opportunistic cleanup; failure here must not block the login
    if let Ok(purged) = auth::purge_expired_tokens(&state.db).await {
        if purged > 0 {
            info!(purged, "Purged expired tokens");
        }
    }

    info!(username = %request.username, "Issued bearer token");
    Ok(Json(TokenResponse {
        token: issued.token,
        expires_at: issued.expires_at,
    }))
}

/// Authenticated caller, extracted from the Authorization header
///
/// Handlers that require authentication take this as an argument; the
/// extractor rejects the request with 401 before the handler runs when
/// the token is missing, unknown, or expired.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub username: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Unauthorized("Expected Bearer token".to_string()))?;

        let username = auth::validate_token(&state.db, token)
            .await
            .map_err(|e| ApiError::Unauthorized(e.to_string()))?;

        Ok(AuthUser { username })
    }
}

/// Build authentication routes
pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/auth/token", post(issue_token))
}
