//! Leaderboard/profile aggregator
//!
//! Folds a finished session into the durable per-user profile and the
//! ranking rollup in one transaction, so a crash can never leave the
//! profile updated but the leaderboard stale (or vice versa). Archival
//! is idempotent: a session already present in the profile's completed
//! games is not folded in again.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use crate::db::{leaderboard, profiles};
use ophiuchus_common::models::{CompletedGame, GameSession, LeaderboardEntry, UserProfile};
use ophiuchus_common::Result;

/// Archive a completed session into the profile and leaderboard
pub async fn archive(pool: &SqlitePool, session: &GameSession, username: &str) -> Result<()> {
    let total_points = session.total_points();
    let now = Utc::now();

    let mut tx = pool.begin().await?;

    let mut profile = profiles::load_profile(&mut *tx, &session.user_id)
        .await?
        .unwrap_or_else(|| {
            UserProfile::new(&session.user_id, &session.spotify_user_id, username)
        });

    if profile.has_archived(session.session_id) {
        // Retry of an already-archived session: nothing to fold in
        tx.rollback().await?;
        info!(session_id = %session.session_id, "Session already archived, skipping");
        return Ok(());
    }

    profile.username = username.to_string();
    profile.total_games_played += 1;
    profile.total_points += total_points;
    profile.completed_games.push(CompletedGame {
        session_id: session.session_id,
        cosmic_song: session.cosmic_song.clone(),
        total_points,
        room_points: session.room_points(),
        final_guess_attempts: session.final_guesses,
        ophiuchus_identity: session.ophiuchus_identity.clone(),
        completed_at: now,
    });

    profiles::save_profile(&mut *tx, &profile).await?;

    let entry = match leaderboard::load_entry(&mut *tx, &session.user_id).await? {
        Some(mut entry) => {
            entry.username = username.to_string();
            entry.total_points += total_points;
            entry.total_games_completed += 1;
            entry.highest_single_game_points = entry.highest_single_game_points.max(total_points);
            entry.last_played_at = now;
            entry
        }
        None => LeaderboardEntry {
            user_id: session.user_id.clone(),
            username: username.to_string(),
            spotify_user_id: session.spotify_user_id.clone(),
            total_points,
            total_games_completed: 1,
            highest_single_game_points: total_points,
            last_played_at: now,
        },
    };

    leaderboard::upsert_entry(&mut *tx, &entry).await?;

    tx.commit().await?;

    info!(
        session_id = %session.session_id,
        user_id = %session.user_id,
        points = total_points,
        "Archived completed session"
    );

    Ok(())
}

/// A user's quest history, most recent first
pub async fn get_history(pool: &SqlitePool, user_id: &str) -> Result<Vec<CompletedGame>> {
    let mut games = profiles::load_profile(pool, user_id)
        .await?
        .map(|p| p.completed_games)
        .unwrap_or_default();

    games.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));

    Ok(games)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ophiuchus_common::db::create_tables;
    use ophiuchus_common::models::{Room, RoomClue, Song};
    use std::collections::HashMap;
    use uuid::Uuid;

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

    fn completed_session(points: i64) -> GameSession {
        let mut room_clues = HashMap::new();
        room_clues.insert(
            Room::Nova,
            RoomClue {
                score: Some(points),
                completed: true,
                correct: Some(true),
                ..Default::default()
            },
        );

        GameSession {
            session_id: Uuid::new_v4(),
            user_id: "u1".to_string(),
            spotify_user_id: "sp1".to_string(),
            cosmic_song: song("cosmic"),
            intermediary_songs: vec![song("i1")],
            initial_clue: "hint".to_string(),
            rooms_completed: vec![Room::Nova],
            room_clues,
            final_guesses: 2,
            completed: true,
            ophiuchus_identity: Some("Serpent Bearer".to_string()),
            version: 3,
            created_at: Utc::now(),
        }
    }

    async fn pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        create_tables(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_archive_creates_profile_and_entry() {
        let pool = pool().await;
        let session = completed_session(200);

        archive(&pool, &session, "player one").await.unwrap();

        let profile = profiles::load_profile(&pool, "u1").await.unwrap().unwrap();
        assert_eq!(profile.total_games_played, 1);
        assert_eq!(profile.total_points, 200);
        assert_eq!(profile.completed_games.len(), 1);
        assert_eq!(
            profile.completed_games[0].ophiuchus_identity.as_deref(),
            Some("Serpent Bearer")
        );

        let entry = leaderboard::load_entry(&pool, "u1").await.unwrap().unwrap();
        assert_eq!(entry.total_points, 200);
        assert_eq!(entry.total_games_completed, 1);
        assert_eq!(entry.highest_single_game_points, 200);
    }

    #[tokio::test]
    async fn test_archive_twice_does_not_double_count() {
        let pool = pool().await;
        let session = completed_session(200);

        archive(&pool, &session, "player one").await.unwrap();
        archive(&pool, &session, "player one").await.unwrap();

        let profile = profiles::load_profile(&pool, "u1").await.unwrap().unwrap();
        assert_eq!(profile.total_games_played, 1);
        assert_eq!(profile.total_points, 200);
        assert_eq!(profile.completed_games.len(), 1);

        let entry = leaderboard::load_entry(&pool, "u1").await.unwrap().unwrap();
        assert_eq!(entry.total_games_completed, 1);
        assert_eq!(entry.total_points, 200);
    }

    #[tokio::test]
    async fn test_second_game_accumulates_and_tracks_best() {
        let pool = pool().await;

        archive(&pool, &completed_session(200), "player one")
            .await
            .unwrap();
        archive(&pool, &completed_session(150), "player one")
            .await
            .unwrap();

        let entry = leaderboard::load_entry(&pool, "u1").await.unwrap().unwrap();
        assert_eq!(entry.total_points, 350);
        assert_eq!(entry.total_games_completed, 2);
        assert_eq!(entry.highest_single_game_points, 200);

        let history = get_history(&pool, "u1").await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[0].completed_at >= history[1].completed_at);
    }
}
