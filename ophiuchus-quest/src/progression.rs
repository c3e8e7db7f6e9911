//! Session progression controller
//!
//! Owns the per-session state machine: creation from a drawn cosmic
//! song, ownership-checked loads, version-guarded room-clue merges,
//! skips, and the completion/archival handoff. All mutation goes
//! through `mutate_session`, which retries the read-modify-write under
//! the optimistic version guard so concurrent requests cannot clobber
//! each other's merges.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::aggregator;
use crate::db::sessions;
use crate::rooms::{self, SKIP_CLUE};
use crate::services::{ContentGenerator, SongSelector};
use ophiuchus_common::models::{GameSession, Room, RoomClue, Song};
use ophiuchus_common::{Error, Result};

/// Bounded retries for version-guarded merges
const MAX_UPDATE_RETRIES: usize = 3;

/// Create a session: draw the cosmic and intermediary songs, generate
/// the initial clue, persist with empty room state.
pub async fn create_session(
    pool: &SqlitePool,
    generator: &dyn ContentGenerator,
    selector: &dyn SongSelector,
    user_id: &str,
    spotify_user_id: &str,
    candidates: &[Song],
) -> Result<GameSession> {
    let selection = selector.select(candidates)?;

    let prompt = format!(
        "A player begins a quest for a hidden song: \"{}\" by {}. Write one cryptic opening \
         clue about it in a single sentence, without naming the title or artist.",
        selection.cosmic.name,
        selection.cosmic.artists.join(", "),
    );
    let initial_clue = generator.generate(&prompt).await?;

    let session = GameSession {
        session_id: Uuid::new_v4(),
        user_id: user_id.to_string(),
        spotify_user_id: spotify_user_id.to_string(),
        cosmic_song: selection.cosmic,
        intermediary_songs: selection.intermediaries,
        initial_clue,
        rooms_completed: Vec::new(),
        room_clues: Default::default(),
        final_guesses: 0,
        completed: false,
        ophiuchus_identity: None,
        version: 0,
        created_at: Utc::now(),
    };

    sessions::insert_session(pool, &session).await?;

    info!(
        session_id = %session.session_id,
        user_id = %session.user_id,
        intermediaries = session.intermediary_songs.len(),
        "Created quest session"
    );

    Ok(session)
}

/// Load a session, enforcing the ownership invariant: NotFound when
/// absent, Forbidden when the requester does not own it.
pub async fn load_owned(
    pool: &SqlitePool,
    session_id: Uuid,
    requester_id: &str,
) -> Result<GameSession> {
    let session = sessions::load_session(pool, session_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Session not found: {}", session_id)))?;

    if session.user_id != requester_id {
        return Err(Error::Forbidden(
            "Session belongs to another user".to_string(),
        ));
    }

    Ok(session)
}

/// Apply a mutation under the optimistic version guard, retrying a
/// bounded number of times when a concurrent writer wins the race.
/// The closure runs against a freshly loaded session on every attempt.
pub async fn mutate_session<F>(
    pool: &SqlitePool,
    session_id: Uuid,
    requester_id: &str,
    mutate: F,
) -> Result<GameSession>
where
    F: Fn(&mut GameSession) -> Result<()>,
{
    for _ in 0..MAX_UPDATE_RETRIES {
        let mut session = load_owned(pool, session_id, requester_id).await?;
        let read_version = session.version;

        mutate(&mut session)?;

        if sessions::update_session_guarded(pool, &session, read_version).await? {
            session.version = read_version + 1;
            return Ok(session);
        }

        warn!(session_id = %session_id, "Session update lost version race, retrying");
    }

    Err(Error::Conflict(
        "Session is being updated concurrently, try again".to_string(),
    ))
}

/// Merge a room outcome into the session's clue record.
///
/// A room that is already completed is frozen: the merge short-circuits
/// and the stored record wins, so replays cannot change the outcome or
/// award points twice. A completing merge appends the room to
/// `rooms_completed` exactly once.
pub async fn update_room_completion(
    pool: &SqlitePool,
    session_id: Uuid,
    requester_id: &str,
    room: Room,
    outcome: RoomClue,
) -> Result<GameSession> {
    mutate_session(pool, session_id, requester_id, move |session| {
        if session.completed {
            return Err(Error::Conflict("Session already completed".to_string()));
        }
        merge_room_clue(session, room, &outcome);
        Ok(())
    })
    .await
}

/// In-memory merge used by the controller and the room guess handlers
pub fn merge_room_clue(session: &mut GameSession, room: Room, outcome: &RoomClue) {
    let entry = session.room_clues.entry(room).or_default();

    if entry.completed {
        // Frozen - replays must not alter the stored result
        return;
    }

    if outcome.clue.is_some() {
        entry.clue = outcome.clue.clone();
    }
    if outcome.correct.is_some() {
        entry.correct = outcome.correct;
    }
    if outcome.score.is_some() {
        entry.score = outcome.score;
    }
    if outcome.audio_url.is_some() {
        entry.audio_url = outcome.audio_url.clone();
    }
    if outcome.questions_asked.is_some() {
        entry.questions_asked = outcome.questions_asked;
    }
    if outcome.target_emotion.is_some() {
        entry.target_emotion = outcome.target_emotion.clone();
    }
    if outcome.attempts > entry.attempts {
        entry.attempts = outcome.attempts;
    }

    if outcome.completed {
        entry.completed = true;
        if !session.rooms_completed.contains(&room) {
            session.rooms_completed.push(room);
        }
    }
}

/// Skip a room: zero points, completed clue `"Room skipped"`.
///
/// Nova is excluded from skip; a completed session rejects skips.
/// Skipping an already-resolved room is a no-op (frozen record wins).
pub async fn skip_room(
    pool: &SqlitePool,
    session_id: Uuid,
    requester_id: &str,
    room: Room,
) -> Result<GameSession> {
    if !room.skippable() {
        return Err(Error::InvalidInput(format!(
            "Room cannot be skipped: {}",
            room
        )));
    }

    let outcome = RoomClue {
        clue: Some(SKIP_CLUE.to_string()),
        correct: Some(false),
        score: Some(0),
        completed: true,
        ..Default::default()
    };

    let session = update_room_completion(pool, session_id, requester_id, room, outcome).await?;

    info!(session_id = %session_id, room = %room, "Room skipped");

    Ok(session)
}

/// Complete a session: requires the final identity resolved, archives
/// into the durable rollups, then best-effort deletes the transient
/// session document.
///
/// A session that is already marked completed but still present means a
/// prior attempt persisted the flag and then failed before archival (or
/// before cleanup); the retry skips straight to the idempotent archive
/// and delete so the result is never stranded.
pub async fn complete_session(
    pool: &SqlitePool,
    session_id: Uuid,
    requester_id: &str,
    username: &str,
) -> Result<GameSession> {
    let current = load_owned(pool, session_id, requester_id).await?;

    let session = if current.completed {
        current
    } else {
        mutate_session(pool, session_id, requester_id, |session| {
            if !session.is_room_completed(Room::Nova) {
                return Err(Error::Conflict(
                    "Final identity not yet resolved".to_string(),
                ));
            }
            session.completed = true;
            Ok(())
        })
        .await?
    };

    aggregator::archive(pool, &session, username).await?;

    // Deletion is best-effort cleanup; completion already succeeded
    // once the archive landed.
    if let Err(e) = sessions::delete_session(pool, session_id).await {
        warn!(session_id = %session_id, error = %e, "Failed to delete archived session");
    }

    info!(
        session_id = %session_id,
        total_points = session.total_points(),
        "Session completed and archived"
    );

    Ok(session)
}

/// Pre-validate the cradle question quota without mutating
pub fn check_question_quota(session: &GameSession) -> Result<i64> {
    let asked = session
        .room_clue(Room::Cradle)
        .and_then(|c| c.questions_asked)
        .unwrap_or(0);

    if !rooms::cradle::can_ask(asked) {
        return Err(Error::InvalidInput(
            "Maximum questions reached".to_string(),
        ));
    }

    Ok(asked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ophiuchus_common::db::create_tables;
    use std::collections::HashMap;

    fn song(id: &str) -> Song {
        Song {
            id: id.to_string(),
            name: format!("Track {}", id),
            artists: vec!["Artist".to_string()],
            album: "Album".to_string(),
            image_url: String::new(),
            spotify_url: None,
        }
    }

    fn session() -> GameSession {
        GameSession {
            session_id: Uuid::new_v4(),
            user_id: "u1".to_string(),
            spotify_user_id: "sp1".to_string(),
            cosmic_song: song("cosmic"),
            intermediary_songs: vec![song("i1"), song("i2")],
            initial_clue: "hint".to_string(),
            rooms_completed: Vec::new(),
            room_clues: HashMap::new(),
            final_guesses: 0,
            completed: false,
            ophiuchus_identity: None,
            version: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_merge_freezes_completed_rooms() {
        let mut s = session();
        merge_room_clue(
            &mut s,
            Room::Nebula,
            &RoomClue {
                clue: Some("reward".to_string()),
                correct: Some(true),
                score: Some(100),
                attempts: 1,
                completed: true,
                ..Default::default()
            },
        );

        // Replay with a different outcome must not alter anything
        merge_room_clue(
            &mut s,
            Room::Nebula,
            &RoomClue {
                clue: Some("other".to_string()),
                score: Some(999),
                completed: true,
                ..Default::default()
            },
        );

        let clue = s.room_clue(Room::Nebula).unwrap();
        assert_eq!(clue.clue.as_deref(), Some("reward"));
        assert_eq!(clue.score, Some(100));
        assert_eq!(s.rooms_completed, vec![Room::Nebula]);
    }

    #[test]
    fn test_merge_appends_room_once() {
        let mut s = session();
        let outcome = RoomClue {
            completed: true,
            score: Some(100),
            ..Default::default()
        };
        merge_room_clue(&mut s, Room::Comet, &outcome);
        merge_room_clue(&mut s, Room::Comet, &outcome);
        assert_eq!(s.rooms_completed, vec![Room::Comet]);
    }

    #[test]
    fn test_merge_keeps_higher_attempt_count() {
        let mut s = session();
        merge_room_clue(
            &mut s,
            Room::Nebula,
            &RoomClue {
                attempts: 2,
                ..Default::default()
            },
        );
        merge_room_clue(
            &mut s,
            Room::Nebula,
            &RoomClue {
                attempts: 1,
                ..Default::default()
            },
        );
        assert_eq!(s.room_clue(Room::Nebula).unwrap().attempts, 2);
    }

    #[tokio::test]
    async fn test_complete_retries_archive_for_stranded_session() {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        create_tables(&pool).await.unwrap();

        // A prior attempt persisted the completed flag but died before
        // archival: the session row is still present and unarchived.
        let mut s = session();
        s.completed = true;
        s.rooms_completed = vec![Room::Nova];
        s.room_clues.insert(
            Room::Nova,
            RoomClue {
                score: Some(200),
                correct: Some(true),
                completed: true,
                ..Default::default()
            },
        );
        sessions::insert_session(&pool, &s).await.unwrap();

        let done = complete_session(&pool, s.session_id, "u1", "player one")
            .await
            .unwrap();
        assert_eq!(done.total_points(), 200);

        let entry = crate::db::leaderboard::load_entry(&pool, "u1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.total_points, 200);
        assert_eq!(entry.total_games_completed, 1);

        // The transient document is gone after the recovered archive
        assert!(sessions::load_session(&pool, s.session_id)
            .await
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_question_quota_check() {
        let mut s = session();
        assert_eq!(check_question_quota(&s).unwrap(), 0);

        s.room_clues.insert(
            Room::Cradle,
            RoomClue {
                questions_asked: Some(5),
                ..Default::default()
            },
        );
        assert!(check_question_quota(&s).is_err());
    }
}
