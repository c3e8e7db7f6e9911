//! Leaderboard and history endpoints

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::aggregator;
use crate::api::auth::AuthUser;
use crate::db::leaderboard::{self, RankedEntry};
use crate::{ApiResult, AppState};
use ophiuchus_common::models::CompletedGame;

const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<i64>,
    pub skip: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub entries: Vec<RankedEntry>,
    /// The caller's own rank; absent until they complete a game
    #[serde(skip_serializing_if = "Option::is_none")]
    pub your_rank: Option<i64>,
    pub total_players: i64,
}

/// GET /api/leaderboard?limit=&skip=
pub async fn get_leaderboard(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<LeaderboardQuery>,
) -> ApiResult<Json<LeaderboardResponse>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let skip = query.skip.unwrap_or(0).max(0);

    let entries = leaderboard::top_players(&state.db, limit, skip).await?;
    let your_rank = leaderboard::rank_of(&state.db, &user.user_id).await?;
    let total_players = leaderboard::player_count(&state.db).await?;

    Ok(Json(LeaderboardResponse {
        entries,
        your_rank,
        total_players,
    }))
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub games: Vec<CompletedGame>,
}

/// GET /api/history
///
/// The caller's archived games, most recent first.
pub async fn get_history(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<HistoryResponse>> {
    let games = aggregator::get_history(&state.db, &user.user_id).await?;
    Ok(Json(HistoryResponse { games }))
}
