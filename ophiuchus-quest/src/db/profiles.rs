//! User profile persistence
//!
//! Functions are generic over the executor so the aggregator can run
//! them inside its archival transaction.

use sqlx::Row;

use ophiuchus_common::models::UserProfile;
use ophiuchus_common::{Error, Result};

/// Load a profile by user ID
pub async fn load_profile<'e, E>(executor: E, user_id: &str) -> Result<Option<UserProfile>>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let row = sqlx::query(
        r#"
        SELECT user_id, spotify_user_id, username,
               total_games_played, total_points, completed_games
        FROM user_profiles
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(executor)
    .await?;

    match row {
        Some(row) => {
            let completed_games: String = row.get("completed_games");
            let completed_games = serde_json::from_str(&completed_games).map_err(|e| {
                Error::Internal(format!("Failed to deserialize completed games: {}", e))
            })?;

            Ok(Some(UserProfile {
                user_id: row.get("user_id"),
                spotify_user_id: row.get("spotify_user_id"),
                username: row.get("username"),
                total_games_played: row.get("total_games_played"),
                total_points: row.get("total_points"),
                completed_games,
            }))
        }
        None => Ok(None),
    }
}

/// Upsert a profile row
pub async fn save_profile<'e, E>(executor: E, profile: &UserProfile) -> Result<()>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let completed_games = serde_json::to_string(&profile.completed_games)
        .map_err(|e| Error::Internal(format!("Failed to serialize completed games: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO user_profiles (
            user_id, spotify_user_id, username,
            total_games_played, total_points, completed_games
        ) VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(user_id) DO UPDATE SET
            spotify_user_id = excluded.spotify_user_id,
            username = excluded.username,
            total_games_played = excluded.total_games_played,
            total_points = excluded.total_points,
            completed_games = excluded.completed_games
        "#,
    )
    .bind(&profile.user_id)
    .bind(&profile.spotify_user_id)
    .bind(&profile.username)
    .bind(profile.total_games_played)
    .bind(profile.total_points)
    .bind(&completed_games)
    .execute(executor)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ophiuchus_common::db::create_tables;
    use sqlx::SqlitePool;

    #[tokio::test]
    async fn test_save_and_load_profile() {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        create_tables(&pool).await.unwrap();

        let mut profile = UserProfile::new("u1", "sp1", "player one");
        profile.total_points = 420;
        profile.total_games_played = 2;

        save_profile(&pool, &profile).await.unwrap();
        let loaded = load_profile(&pool, "u1").await.unwrap().unwrap();
        assert_eq!(loaded.total_points, 420);
        assert_eq!(loaded.username, "player one");

        // Upsert overwrites counters
        profile.total_points = 500;
        save_profile(&pool, &profile).await.unwrap();
        let loaded = load_profile(&pool, "u1").await.unwrap().unwrap();
        assert_eq!(loaded.total_points, 500);

        assert!(load_profile(&pool, "nobody").await.unwrap().is_none());
    }
}
