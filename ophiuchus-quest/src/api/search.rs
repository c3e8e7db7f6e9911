//! Track search endpoint
//!
//! Thin pass-through to the track oracle so clients can resolve a
//! title into the catalog ID the guess endpoints expect.

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::api::auth::AuthUser;
use crate::{ApiError, ApiResult, AppState};
use ophiuchus_common::models::Song;

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub tracks: Vec<Song>,
}

/// GET /api/search?q=&limit=
pub async fn search_tracks(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<SearchResponse>> {
    let q = query.q.trim();
    if q.is_empty() {
        return Err(ApiError::BadRequest("Search query cannot be empty".to_string()));
    }

    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let tracks = state.oracle.search_track(&user.oracle_bearer, q, limit).await?;

    Ok(Json(SearchResponse { tracks }))
}
