//! Game session persistence
//!
//! One row per in-flight quest. Aggregate fields (songs, room clues,
//! completed rooms) are JSON text columns; `version` is the
//! optimistic-concurrency counter checked on every update so concurrent
//! read-modify-write merges cannot clobber each other.

use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use ophiuchus_common::models::GameSession;
use ophiuchus_common::{Error, Result};

fn serialize<T: serde::Serialize>(what: &str, value: &T) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|e| Error::Internal(format!("Failed to serialize {}: {}", what, e)))
}

fn deserialize<T: serde::de::DeserializeOwned>(what: &str, value: &str) -> Result<T> {
    serde_json::from_str(value)
        .map_err(|e| Error::Internal(format!("Failed to deserialize {}: {}", what, e)))
}

/// Insert a freshly created session
pub async fn insert_session(pool: &SqlitePool, session: &GameSession) -> Result<()> {
    let cosmic_song = serialize("cosmic song", &session.cosmic_song)?;
    let intermediary_songs = serialize("intermediary songs", &session.intermediary_songs)?;
    let rooms_completed = serialize("rooms completed", &session.rooms_completed)?;
    let room_clues = serialize("room clues", &session.room_clues)?;

    sqlx::query(
        r#"
        INSERT INTO game_sessions (
            session_id, user_id, spotify_user_id, cosmic_song,
            intermediary_songs, initial_clue, rooms_completed, room_clues,
            final_guesses, completed, ophiuchus_identity, version, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(session.session_id.to_string())
    .bind(&session.user_id)
    .bind(&session.spotify_user_id)
    .bind(&cosmic_song)
    .bind(&intermediary_songs)
    .bind(&session.initial_clue)
    .bind(&rooms_completed)
    .bind(&room_clues)
    .bind(session.final_guesses)
    .bind(session.completed as i64)
    .bind(&session.ophiuchus_identity)
    .bind(session.version)
    .bind(session.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Load a session by ID
pub async fn load_session(pool: &SqlitePool, session_id: Uuid) -> Result<Option<GameSession>> {
    let row = sqlx::query(
        r#"
        SELECT session_id, user_id, spotify_user_id, cosmic_song,
               intermediary_songs, initial_clue, rooms_completed, room_clues,
               final_guesses, completed, ophiuchus_identity, version, created_at
        FROM game_sessions
        WHERE session_id = ?
        "#,
    )
    .bind(session_id.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let created_at: String = row.get("created_at");
            let created_at = chrono::DateTime::parse_from_rfc3339(&created_at)
                .map_err(|e| Error::Internal(format!("Failed to parse created_at: {}", e)))?
                .with_timezone(&chrono::Utc);

            Ok(Some(GameSession {
                session_id,
                user_id: row.get("user_id"),
                spotify_user_id: row.get("spotify_user_id"),
                cosmic_song: deserialize("cosmic song", row.get("cosmic_song"))?,
                intermediary_songs: deserialize(
                    "intermediary songs",
                    row.get("intermediary_songs"),
                )?,
                initial_clue: row.get("initial_clue"),
                rooms_completed: deserialize("rooms completed", row.get("rooms_completed"))?,
                room_clues: deserialize("room clues", row.get("room_clues"))?,
                final_guesses: row.get("final_guesses"),
                completed: row.get::<i64, _>("completed") != 0,
                ophiuchus_identity: row.get("ophiuchus_identity"),
                version: row.get("version"),
                created_at,
            }))
        }
        None => Ok(None),
    }
}

/// Write back a mutated session, guarded by the version it was read at.
///
/// The stored row is updated only if its version still equals
/// `expected_version`; the new row carries `expected_version + 1`.
/// Returns false when another writer got there first.
pub async fn update_session_guarded(
    pool: &SqlitePool,
    session: &GameSession,
    expected_version: i64,
) -> Result<bool> {
    let rooms_completed = serialize("rooms completed", &session.rooms_completed)?;
    let room_clues = serialize("room clues", &session.room_clues)?;

    let result = sqlx::query(
        r#"
        UPDATE game_sessions
        SET rooms_completed = ?,
            room_clues = ?,
            final_guesses = ?,
            completed = ?,
            ophiuchus_identity = ?,
            version = ?
        WHERE session_id = ? AND version = ?
        "#,
    )
    .bind(&rooms_completed)
    .bind(&room_clues)
    .bind(session.final_guesses)
    .bind(session.completed as i64)
    .bind(&session.ophiuchus_identity)
    .bind(expected_version + 1)
    .bind(session.session_id.to_string())
    .bind(expected_version)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Delete a session (best-effort cleanup after archival)
pub async fn delete_session(pool: &SqlitePool, session_id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM game_sessions WHERE session_id = ?")
        .bind(session_id.to_string())
        .execute(pool)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ophiuchus_common::db::create_tables;
    use ophiuchus_common::models::{Room, RoomClue, Song};
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
            initial_clue: "a hint".to_string(),
            rooms_completed: Vec::new(),
            room_clues: HashMap::new(),
            final_guesses: 0,
            completed: false,
            ophiuchus_identity: None,
            version: 0,
            created_at: Utc::now(),
        }
    }

    async fn pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        create_tables(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_insert_and_load_round_trip() {
        let pool = pool().await;
        let mut s = session();
        s.room_clues.insert(
            Room::Nebula,
            RoomClue {
                clue: Some("riddle".to_string()),
                attempts: 1,
                ..Default::default()
            },
        );

        insert_session(&pool, &s).await.unwrap();
        let loaded = load_session(&pool, s.session_id).await.unwrap().unwrap();

        assert_eq!(loaded.user_id, "u1");
        assert_eq!(loaded.cosmic_song.id, "cosmic");
        assert_eq!(loaded.intermediary_songs.len(), 2);
        assert_eq!(
            loaded.room_clues.get(&Room::Nebula).unwrap().clue.as_deref(),
            Some("riddle")
        );
        assert_eq!(loaded.version, 0);
    }

    #[tokio::test]
    async fn test_load_missing_session_is_none() {
        let pool = pool().await;
        assert!(load_session(&pool, Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_version_guard_rejects_stale_writer() {
        let pool = pool().await;
        let s = session();
        insert_session(&pool, &s).await.unwrap();

        let mut first = load_session(&pool, s.session_id).await.unwrap().unwrap();
        let mut second = first.clone();

        first.final_guesses = 1;
        assert!(update_session_guarded(&pool, &first, 0).await.unwrap());

        // Second writer read version 0 but the row is now at version 1
        second.final_guesses = 9;
        assert!(!update_session_guarded(&pool, &second, 0).await.unwrap());

        let loaded = load_session(&pool, s.session_id).await.unwrap().unwrap();
        assert_eq!(loaded.final_guesses, 1);
        assert_eq!(loaded.version, 1);
    }

    #[tokio::test]
    async fn test_delete_session() {
        let pool = pool().await;
        let s = session();
        insert_session(&pool, &s).await.unwrap();
        delete_session(&pool, s.session_id).await.unwrap();
        assert!(load_session(&pool, s.session_id).await.unwrap().is_none());
    }
}
