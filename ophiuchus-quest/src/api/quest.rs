//! Quest session endpoints
//!
//! Session creation, owner-only reads with cosmic-song redaction,
//! room skips, and completion.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::api::auth::AuthUser;
use crate::progression;
use crate::{ApiError, ApiResult, AppState};
use ophiuchus_common::models::{GameSession, Room, RoomClue, Song};

/// How many top tracks to draw candidates from
const CANDIDATE_LIMIT: usize = 20;

/// Client-facing session projection.
///
/// The cosmic song is redacted (omitted) until the session is
/// completed; leaking it early would hand the player the answer.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cosmic_song: Option<Song>,
    pub intermediary_songs: Vec<Song>,
    pub initial_clue: String,
    pub rooms_completed: Vec<Room>,
    pub room_clues: HashMap<Room, RoomClue>,
    pub final_guesses: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ophiuchus_identity: Option<String>,
    pub total_points: i64,
    pub created_at: DateTime<Utc>,
}

impl SessionView {
    pub fn from_session(session: GameSession) -> Self {
        let total_points = session.total_points();
        let cosmic_song = if session.completed {
            Some(session.cosmic_song)
        } else {
            None
        };

        Self {
            session_id: session.session_id,
            completed: session.completed,
            cosmic_song,
            intermediary_songs: session.intermediary_songs,
            initial_clue: session.initial_clue,
            rooms_completed: session.rooms_completed,
            room_clues: session.room_clues,
            final_guesses: session.final_guesses,
            ophiuchus_identity: session.ophiuchus_identity,
            total_points,
            created_at: session.created_at,
        }
    }
}

/// POST /api/quest/start
///
/// Draws the cosmic and intermediary songs from the player's listening
/// history and creates a fresh session.
pub async fn start_quest(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<SessionView>> {
    let candidates = state
        .oracle
        .top_tracks(&user.oracle_bearer, CANDIDATE_LIMIT)
        .await?;

    let session = progression::create_session(
        &state.db,
        state.generator.as_ref(),
        state.selector.as_ref(),
        &user.user_id,
        &user.spotify_user_id,
        &candidates,
    )
    .await?;

    Ok(Json(SessionView::from_session(session)))
}

/// GET /api/quest/:session_id
///
/// Owner-only; the cosmic song stays redacted pre-completion.
pub async fn get_quest(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<SessionView>> {
    let session = progression::load_owned(&state.db, session_id, &user.user_id).await?;
    Ok(Json(SessionView::from_session(session)))
}

#[derive(Debug, Serialize)]
pub struct CompleteResponse {
    pub session_id: Uuid,
    pub completed: bool,
    pub total_points: i64,
    pub cosmic_song: Song,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ophiuchus_identity: Option<String>,
}

/// POST /api/quest/:session_id/complete
///
/// Marks the session completed, archives it into the profile and
/// leaderboard, and retires the session document. A repeat call sees
/// 404 once the document is gone; archival itself is idempotent as a
/// second guard.
pub async fn complete_quest(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<CompleteResponse>> {
    let session =
        progression::complete_session(&state.db, session_id, &user.user_id, &user.username)
            .await?;

    Ok(Json(CompleteResponse {
        session_id: session.session_id,
        completed: true,
        total_points: session.total_points(),
        cosmic_song: session.cosmic_song,
        ophiuchus_identity: session.ophiuchus_identity,
    }))
}

#[derive(Debug, Serialize)]
pub struct SkipResponse {
    pub room: Room,
    pub clue: String,
    pub score: i64,
    pub completed: bool,
}

/// POST /api/quest/:session_id/skip/:room
///
/// Valid only for the non-terminal rooms; nova and unknown room
/// identifiers are rejected before any mutation.
pub async fn skip_room(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((session_id, room)): Path<(Uuid, String)>,
) -> ApiResult<Json<SkipResponse>> {
    let room: Room = room
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid room identifier: {}", room)))?;

    let session = progression::skip_room(&state.db, session_id, &user.user_id, room).await?;

    // Skipping an already-resolved room is a no-op; report the frozen
    // record either way.
    let stored = session.room_clue(room).cloned().unwrap_or_default();

    Ok(Json(SkipResponse {
        room,
        clue: stored.clue.unwrap_or_default(),
        score: stored.score.unwrap_or(0),
        completed: true,
    }))
}
