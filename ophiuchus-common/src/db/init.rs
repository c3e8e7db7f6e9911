//! Database initialization
//!
//! Creates the SQLite database on first run, applies connection
//! pragmas, and creates the schema idempotently. The pool is acquired
//! once at startup and shared across requests; SQLite's atomic
//! single-row updates back the per-session merge semantics.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL allows concurrent readers alongside the single writer
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_tables(&pool).await?;

    Ok(pool)
}

/// Create all tables (idempotent - safe to call multiple times)
///
/// Also used by integration tests against `sqlite::memory:` pools.
pub async fn create_tables(pool: &SqlitePool) -> Result<()> {
    create_game_sessions_table(pool).await?;
    create_user_profiles_table(pool).await?;
    create_leaderboard_table(pool).await?;
    create_auth_tokens_table(pool).await?;
    Ok(())
}

/// Transient quest sessions. Aggregate fields (songs, room clues) are
/// JSON text columns; `version` backs optimistic concurrency on merges.
async fn create_game_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS game_sessions (
            session_id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            spotify_user_id TEXT NOT NULL,
            cosmic_song TEXT NOT NULL,
            intermediary_songs TEXT NOT NULL,
            initial_clue TEXT NOT NULL,
            rooms_completed TEXT NOT NULL DEFAULT '[]',
            room_clues TEXT NOT NULL DEFAULT '{}',
            final_guesses INTEGER NOT NULL DEFAULT 0,
            completed INTEGER NOT NULL DEFAULT 0,
            ophiuchus_identity TEXT,
            version INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_game_sessions_user ON game_sessions(user_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Durable per-user profiles; `completed_games` is a JSON array of
/// CompletedGame snapshots, append-only.
async fn create_user_profiles_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_profiles (
            user_id TEXT PRIMARY KEY,
            spotify_user_id TEXT NOT NULL,
            username TEXT NOT NULL,
            total_games_played INTEGER NOT NULL DEFAULT 0,
            total_points INTEGER NOT NULL DEFAULT 0,
            completed_games TEXT NOT NULL DEFAULT '[]'
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Ranking rollup, one row per user, updated atomically alongside the
/// profile on each archival.
async fn create_leaderboard_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS leaderboard (
            user_id TEXT PRIMARY KEY,
            username TEXT NOT NULL,
            spotify_user_id TEXT NOT NULL,
            total_points INTEGER NOT NULL DEFAULT 0,
            total_games_completed INTEGER NOT NULL DEFAULT 0,
            highest_single_game_points INTEGER NOT NULL DEFAULT 0,
            last_played_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_leaderboard_points ON leaderboard(total_points DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Bearer tokens issued by the external identity provider. The quest
/// service only validates and reads; issuance/refresh happen elsewhere.
async fn create_auth_tokens_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS auth_tokens (
            token TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            username TEXT NOT NULL,
            spotify_user_id TEXT NOT NULL,
            oracle_bearer TEXT NOT NULL,
            expires_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_tables_is_idempotent() {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        create_tables(&pool).await.unwrap();
        create_tables(&pool).await.unwrap();

        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM game_sessions")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_init_database_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ophiuchus.db");
        let pool = init_database(&path).await.unwrap();
        assert!(path.exists());

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM leaderboard")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
