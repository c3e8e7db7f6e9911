//! ophiuchus-quest library - the Ophiuchus game service
//!
//! Room puzzle engines, session progression, and leaderboard/profile
//! aggregation behind an axum HTTP surface. Exposed as a library so the
//! integration tests can drive the router directly.

pub mod aggregator;
pub mod api;
pub mod db;
pub mod error;
pub mod progression;
pub mod rooms;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use std::sync::Arc;

use axum::Router;
use sqlx::SqlitePool;

use crate::services::{ContentGenerator, EmotionScorer, SongSelector, TrackOracle};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Content generator collaborator
    pub generator: Arc<dyn ContentGenerator>,
    /// Music catalog collaborator
    pub oracle: Arc<dyn TrackOracle>,
    /// Cosmic/intermediary song selection policy
    pub selector: Arc<dyn SongSelector>,
    /// Aurora emotion-match scorer
    pub scorer: Arc<dyn EmotionScorer>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        generator: Arc<dyn ContentGenerator>,
        oracle: Arc<dyn TrackOracle>,
        selector: Arc<dyn SongSelector>,
        scorer: Arc<dyn EmotionScorer>,
    ) -> Self {
        Self {
            db,
            generator,
            oracle,
            selector,
            scorer,
        }
    }
}

/// Build application router
///
/// Quest and leaderboard routes require a bearer token; the health
/// endpoint does not.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};
    use tower_http::cors::CorsLayer;

    // Protected routes (require authentication)
    let protected = Router::new()
        .route("/api/quest/start", post(api::quest::start_quest))
        .route("/api/quest/:session_id", get(api::quest::get_quest))
        .route(
            "/api/quest/:session_id/complete",
            post(api::quest::complete_quest),
        )
        .route(
            "/api/quest/:session_id/skip/:room",
            post(api::quest::skip_room),
        )
        .route(
            "/api/quest/:session_id/rooms/:room/puzzle",
            get(api::rooms::get_puzzle),
        )
        .route(
            "/api/quest/:session_id/rooms/:room/guess",
            post(api::rooms::post_guess),
        )
        .route(
            "/api/quest/:session_id/rooms/cradle/question",
            post(api::rooms::post_question),
        )
        .route("/api/search", get(api::search::search_tracks))
        .route("/api/leaderboard", get(api::leaderboard::get_leaderboard))
        .route("/api/history", get(api::leaderboard::get_history))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth::auth_middleware,
        ));

    // Public routes (no authentication)
    let public = Router::new().merge(api::health::health_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
