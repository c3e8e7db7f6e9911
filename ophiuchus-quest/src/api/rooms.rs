//! Room puzzle endpoints
//!
//! Puzzle generation, guess checks, and the cradle question flow. A
//! completed room short-circuits to its stored record on every path:
//! content is never regenerated and points are never re-awarded.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::api::auth::AuthUser;
use crate::progression;
use crate::rooms::{self, GuessOutcome};
use crate::{ApiError, ApiResult, AppState};
use ophiuchus_common::models::{GameSession, Room, RoomClue, Song};
use ophiuchus_common::Error;

#[derive(Debug, Serialize)]
pub struct PuzzleResponse {
    pub room: Room,
    pub clue: String,
    pub attempts: i64,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub questions_remaining: Option<i64>,
}

fn puzzle_response(room: Room, clue: &RoomClue) -> PuzzleResponse {
    let questions_remaining = match room {
        Room::Cradle => Some(rooms::cradle::questions_remaining(
            clue.questions_asked.unwrap_or(0),
        )),
        _ => None,
    };

    PuzzleResponse {
        room,
        clue: clue.clue.clone().unwrap_or_default(),
        attempts: clue.attempts,
        completed: clue.completed,
        audio_url: clue.audio_url.clone(),
        questions_remaining,
    }
}

/// GET /api/quest/:session_id/rooms/:room/puzzle
///
/// Generates the room's puzzle content on first request and stores it
/// with the room clue; later requests return the stored content
/// verbatim. Nothing is persisted when generation fails.
pub async fn get_puzzle(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((session_id, room)): Path<(Uuid, String)>,
) -> ApiResult<Json<PuzzleResponse>> {
    let room = parse_room(&room)?;
    let session = progression::load_owned(&state.db, session_id, &user.user_id).await?;

    // Stored content wins: completed rooms are frozen, and an already
    // generated puzzle stays stable across refreshes.
    if let Some(stored) = session.room_clue(room) {
        if stored.completed || stored.clue.is_some() {
            return Ok(Json(puzzle_response(room, stored)));
        }
    }

    let generator = state.generator.as_ref();
    let mut outcome = RoomClue::default();

    match room {
        Room::Nebula => {
            let source = rooms::nebula::puzzle_source(&session.intermediary_songs)?;
            outcome.clue = Some(rooms::nebula::generate_riddle(generator, source).await?);
        }
        Room::Cradle => {
            outcome.clue =
                Some(rooms::cradle::generate_intro(generator, &session.cosmic_song).await?);
        }
        Room::Comet => {
            let source = rooms::comet::puzzle_source(&session.intermediary_songs)?;
            outcome.clue = Some(rooms::comet::generate_lyric_flash(generator, source).await?);
        }
        Room::Aurora => {
            let vignette =
                rooms::aurora::generate_vignette(generator, &session.cosmic_song).await?;
            outcome.clue = Some(vignette.text);
            outcome.target_emotion = Some(vignette.emotion);
        }
        Room::Nova => {
            outcome.clue =
                Some(rooms::nova::generate_prompt(generator, &session.cosmic_song).await?);
        }
    }

    let updated =
        progression::update_room_completion(&state.db, session_id, &user.user_id, room, outcome)
            .await?;

    let clue = updated
        .room_clue(room)
        .cloned()
        .unwrap_or_default();

    Ok(Json(puzzle_response(room, &clue)))
}

#[derive(Debug, Deserialize)]
pub struct GuessRequest {
    /// Guessed track ID (nebula, comet, aurora, nova)
    pub track_id: Option<String>,
    /// Guessed artist name (cradle)
    pub artist: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GuessResponse {
    pub room: Room,
    pub correct: bool,
    pub score: i64,
    /// Non-empty only when the check passed
    pub reward_clue: String,
    pub attempts: i64,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub penalty_clue: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emotion_score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ophiuchus_identity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cosmic_song: Option<Song>,
}

/// POST /api/quest/:session_id/rooms/:room/guess
pub async fn post_guess(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((session_id, room)): Path<(Uuid, String)>,
    Json(payload): Json<GuessRequest>,
) -> ApiResult<Json<GuessResponse>> {
    let room = parse_room(&room)?;
    let session = progression::load_owned(&state.db, session_id, &user.user_id).await?;

    if session.completed {
        return Err(ApiError::Conflict("Session already completed".to_string()));
    }

    // Idempotent replay: a resolved room answers from its frozen record
    if let Some(stored) = session.room_clue(room) {
        if stored.completed {
            return Ok(Json(GuessResponse {
                room,
                correct: stored.correct.unwrap_or(false),
                score: stored.score.unwrap_or(0),
                reward_clue: stored.clue.clone().unwrap_or_default(),
                attempts: stored.attempts,
                completed: true,
                penalty_clue: None,
                emotion_score: None,
                ophiuchus_identity: session.ophiuchus_identity.clone(),
                cosmic_song: None,
            }));
        }
    }

    let generator = state.generator.as_ref();

    let mut penalty_clue = None;
    let mut emotion_score = None;
    let mut identity = None;

    let outcome = match room {
        Room::Nebula => {
            let track_id = require_track_id(&payload)?;
            let target = rooms::nebula::puzzle_source(&session.intermediary_songs)?;
            let outcome = rooms::nebula::resolve_guess(
                generator,
                &track_id,
                target,
                &session.cosmic_song,
            )
            .await?;
            if !outcome.correct {
                penalty_clue =
                    Some(rooms::nebula::penalty_clue(generator, &session.cosmic_song).await?);
            }
            outcome
        }
        Room::Cradle => {
            let artist = payload.artist.clone().ok_or_else(|| {
                ApiError::BadRequest("Missing field: artist".to_string())
            })?;
            rooms::cradle::resolve_guess(generator, &artist, &session.cosmic_song).await?
        }
        Room::Comet => {
            let track_id = require_track_id(&payload)?;
            let target = rooms::comet::puzzle_source(&session.intermediary_songs)?;
            rooms::comet::resolve_guess(generator, &track_id, target, &session.cosmic_song)
                .await?
        }
        Room::Aurora => {
            let track_id = require_track_id(&payload)?;
            let emotion = session
                .room_clue(Room::Aurora)
                .and_then(|c| c.target_emotion.clone())
                .ok_or_else(|| {
                    ApiError::BadRequest(
                        "Aurora puzzle has not been generated yet".to_string(),
                    )
                })?;
            let guess = state.oracle.get_track(&user.oracle_bearer, &track_id).await?;
            let (outcome, score) = rooms::aurora::resolve_guess(
                generator,
                state.scorer.as_ref(),
                &guess,
                &session.cosmic_song,
                &emotion,
            )
            .await?;
            emotion_score = Some(score);
            outcome
        }
        Room::Nova => {
            let track_id = require_track_id(&payload)?;
            let resolution =
                rooms::nova::resolve_guess(generator, &track_id, &session.cosmic_song).await?;
            identity = resolution.identity;
            resolution.outcome
        }
    };

    let updated = persist_guess(&state, session_id, &user, room, &outcome, &identity).await?;

    let attempts = updated
        .room_clue(room)
        .map(|c| c.attempts)
        .unwrap_or(0);

    let cosmic_song = (room == Room::Nova && outcome.correct)
        .then(|| updated.cosmic_song.clone());

    Ok(Json(GuessResponse {
        room,
        correct: outcome.correct,
        score: outcome.score,
        reward_clue: outcome.reward_clue,
        attempts,
        completed: outcome.correct,
        penalty_clue,
        emotion_score,
        ophiuchus_identity: identity,
        cosmic_song,
    }))
}

/// Persist a checked guess under the version guard. The closure re-runs
/// against a fresh session on every retry, so attempt counts and the
/// nova final-guess counter stay consistent under concurrency.
async fn persist_guess(
    state: &AppState,
    session_id: Uuid,
    user: &AuthUser,
    room: Room,
    outcome: &GuessOutcome,
    identity: &Option<String>,
) -> ApiResult<GameSession> {
    let updated = progression::mutate_session(&state.db, session_id, &user.user_id, |session| {
        if session.completed {
            return Err(Error::Conflict("Session already completed".to_string()));
        }

        let prev_attempts = session.room_clue(room).map(|c| c.attempts).unwrap_or(0);

        let merge = RoomClue {
            clue: outcome.correct.then(|| outcome.reward_clue.clone()),
            correct: Some(outcome.correct),
            score: outcome.correct.then_some(outcome.score),
            attempts: prev_attempts + 1,
            completed: outcome.correct,
            ..Default::default()
        };
        progression::merge_room_clue(session, room, &merge);

        if room == Room::Nova {
            if outcome.correct {
                session.ophiuchus_identity = identity.clone();
            } else {
                session.final_guesses += 1;
            }
        }

        Ok(())
    })
    .await?;

    Ok(updated)
}

#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct QuestionResponse {
    pub answer: String,
    pub questions_asked: i64,
    pub questions_remaining: i64,
    pub can_ask: bool,
}

/// POST /api/quest/:session_id/rooms/cradle/question
///
/// One free-text question about the hidden artist. At most five per
/// session; the sixth attempt is rejected before any generator call,
/// with the exhausted quota state in the response body.
pub async fn post_question(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<QuestionRequest>,
) -> ApiResult<Response> {
    if payload.question.trim().is_empty() {
        return Err(ApiError::BadRequest("Question cannot be empty".to_string()));
    }

    let session = progression::load_owned(&state.db, session_id, &user.user_id).await?;

    if session.completed {
        return Err(ApiError::Conflict("Session already completed".to_string()));
    }
    if session.is_room_completed(Room::Cradle) {
        return Err(ApiError::Conflict("Room already completed".to_string()));
    }

    let asked = session
        .room_clue(Room::Cradle)
        .and_then(|c| c.questions_asked)
        .unwrap_or(0);
    if !rooms::cradle::can_ask(asked) {
        return Ok(quota_exhausted_response(asked));
    }

    let answer = rooms::cradle::answer_question(
        state.generator.as_ref(),
        &session.cosmic_song,
        &payload.question,
    )
    .await?;

    let updated = progression::mutate_session(&state.db, session_id, &user.user_id, |session| {
        if session.completed {
            return Err(Error::Conflict("Session already completed".to_string()));
        }
        // Quota re-checked under the guard so concurrent questions
        // cannot slip past the limit.
        let asked = progression::check_question_quota(session)?;
        let merge = RoomClue {
            questions_asked: Some(asked + 1),
            ..Default::default()
        };
        progression::merge_room_clue(session, Room::Cradle, &merge);
        Ok(())
    })
    .await?;

    let questions_asked = updated
        .room_clue(Room::Cradle)
        .and_then(|c| c.questions_asked)
        .unwrap_or(0);
    let questions_remaining = rooms::cradle::questions_remaining(questions_asked);

    Ok(Json(QuestionResponse {
        answer,
        questions_asked,
        questions_remaining,
        can_ask: rooms::cradle::can_ask(questions_asked),
    })
    .into_response())
}

/// 400 carrying the exhausted quota state alongside the error envelope
fn quota_exhausted_response(questions_asked: i64) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": {
                "code": "BAD_REQUEST",
                "message": "Maximum questions reached",
            },
            "questions_asked": questions_asked,
            "questions_remaining": 0,
            "can_ask": false,
        })),
    )
        .into_response()
}

fn parse_room(raw: &str) -> ApiResult<Room> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid room identifier: {}", raw)))
}

fn require_track_id(payload: &GuessRequest) -> ApiResult<String> {
    payload
        .track_id
        .clone()
        .ok_or_else(|| ApiError::BadRequest("Missing field: track_id".to_string()))
}
