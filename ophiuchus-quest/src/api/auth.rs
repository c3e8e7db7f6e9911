//! Bearer-token authentication middleware
//!
//! Tokens come from the external identity provider; the middleware
//! validates the presented token against the store, rejects missing,
//! unknown, or expired credentials with 401, and injects the resolved
//! identity as an `AuthUser` extension for downstream handlers.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use tracing::warn;

use crate::db::tokens;
use crate::{ApiError, AppState};

/// Authenticated identity injected into protected handlers
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub username: String,
    pub spotify_user_id: String,
    /// Bearer credential for the track oracle
    pub oracle_bearer: String,
}

/// Authentication middleware for protected routes
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("Expected Bearer token".to_string()))?;

    let stored = tokens::lookup_token(&state.db, token)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::Unauthorized("Unknown token".to_string()))?;

    if stored.is_expired(Utc::now()) {
        warn!(user_id = %stored.user_id, "Rejected expired token");
        return Err(ApiError::Unauthorized("Token expired".to_string()));
    }

    request.extensions_mut().insert(AuthUser {
        user_id: stored.user_id,
        username: stored.username,
        spotify_user_id: stored.spotify_user_id,
        oracle_bearer: stored.oracle_bearer,
    });

    Ok(next.run(request).await)
}
