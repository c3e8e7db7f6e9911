//! Leaderboard persistence and ranking queries
//!
//! Rank is defined as `count(players with more points) + 1`, so tied
//! scores share a rank (non-dense ranking). Page ordering breaks ties
//! deterministically by user ID.

use serde::Serialize;
use sqlx::{Row, SqlitePool};

use ophiuchus_common::models::LeaderboardEntry;
use ophiuchus_common::{Error, Result};

/// A leaderboard entry together with its shared rank
#[derive(Debug, Clone, Serialize)]
pub struct RankedEntry {
    pub rank: i64,
    #[serde(flatten)]
    pub entry: LeaderboardEntry,
}

/// Upsert a user's rollup row (called inside the archival transaction)
pub async fn upsert_entry<'e, E>(executor: E, entry: &LeaderboardEntry) -> Result<()>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO leaderboard (
            user_id, username, spotify_user_id, total_points,
            total_games_completed, highest_single_game_points, last_played_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(user_id) DO UPDATE SET
            username = excluded.username,
            spotify_user_id = excluded.spotify_user_id,
            total_points = excluded.total_points,
            total_games_completed = excluded.total_games_completed,
            highest_single_game_points = excluded.highest_single_game_points,
            last_played_at = excluded.last_played_at
        "#,
    )
    .bind(&entry.user_id)
    .bind(&entry.username)
    .bind(&entry.spotify_user_id)
    .bind(entry.total_points)
    .bind(entry.total_games_completed)
    .bind(entry.highest_single_game_points)
    .bind(entry.last_played_at.to_rfc3339())
    .execute(executor)
    .await?;

    Ok(())
}

/// Load a user's rollup row
pub async fn load_entry<'e, E>(executor: E, user_id: &str) -> Result<Option<LeaderboardEntry>>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let row = sqlx::query(
        r#"
        SELECT user_id, username, spotify_user_id, total_points,
               total_games_completed, highest_single_game_points, last_played_at
        FROM leaderboard
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(executor)
    .await?;

    row.map(entry_from_row).transpose()
}

/// Ranked page of top players, ordered by points descending with
/// user-ID tiebreak
pub async fn top_players(pool: &SqlitePool, limit: i64, skip: i64) -> Result<Vec<RankedEntry>> {
    let rows = sqlx::query(
        r#"
        SELECT user_id, username, spotify_user_id, total_points,
               total_games_completed, highest_single_game_points, last_played_at,
               (SELECT COUNT(*) FROM leaderboard other
                WHERE other.total_points > leaderboard.total_points) + 1 AS rank
        FROM leaderboard
        ORDER BY total_points DESC, user_id ASC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(limit)
    .bind(skip)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            let rank: i64 = row.get("rank");
            Ok(RankedEntry {
                rank,
                entry: entry_from_row(row)?,
            })
        })
        .collect()
}

/// Shared rank for a user: players with strictly more points, plus one.
/// None when the user has no leaderboard row yet.
pub async fn rank_of(pool: &SqlitePool, user_id: &str) -> Result<Option<i64>> {
    let points: Option<i64> =
        sqlx::query_scalar("SELECT total_points FROM leaderboard WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

    match points {
        Some(points) => {
            let ahead: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM leaderboard WHERE total_points > ?")
                    .bind(points)
                    .fetch_one(pool)
                    .await?;
            Ok(Some(ahead + 1))
        }
        None => Ok(None),
    }
}

/// Total number of ranked players
pub async fn player_count(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM leaderboard")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

fn entry_from_row(row: sqlx::sqlite::SqliteRow) -> Result<LeaderboardEntry> {
    let last_played_at: String = row.get("last_played_at");
    let last_played_at = chrono::DateTime::parse_from_rfc3339(&last_played_at)
        .map_err(|e| Error::Internal(format!("Failed to parse last_played_at: {}", e)))?
        .with_timezone(&chrono::Utc);

    Ok(LeaderboardEntry {
        user_id: row.get("user_id"),
        username: row.get("username"),
        spotify_user_id: row.get("spotify_user_id"),
        total_points: row.get("total_points"),
        total_games_completed: row.get("total_games_completed"),
        highest_single_game_points: row.get("highest_single_game_points"),
        last_played_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ophiuchus_common::db::create_tables;

    fn entry(user_id: &str, points: i64) -> LeaderboardEntry {
        LeaderboardEntry {
            user_id: user_id.to_string(),
            username: format!("user {}", user_id),
            spotify_user_id: format!("sp-{}", user_id),
            total_points: points,
            total_games_completed: 1,
            highest_single_game_points: points,
            last_played_at: Utc::now(),
        }
    }

    async fn pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        create_tables(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_tied_scores_share_a_rank() {
        let pool = pool().await;
        upsert_entry(&pool, &entry("a", 100)).await.unwrap();
        upsert_entry(&pool, &entry("b", 100)).await.unwrap();
        upsert_entry(&pool, &entry("c", 80)).await.unwrap();

        assert_eq!(rank_of(&pool, "a").await.unwrap(), Some(1));
        assert_eq!(rank_of(&pool, "b").await.unwrap(), Some(1));
        assert_eq!(rank_of(&pool, "c").await.unwrap(), Some(3));
        assert_eq!(rank_of(&pool, "missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_top_players_order_and_pagination() {
        let pool = pool().await;
        upsert_entry(&pool, &entry("a", 100)).await.unwrap();
        upsert_entry(&pool, &entry("b", 100)).await.unwrap();
        upsert_entry(&pool, &entry("c", 80)).await.unwrap();
        upsert_entry(&pool, &entry("d", 120)).await.unwrap();

        let page = top_players(&pool, 10, 0).await.unwrap();
        let ids: Vec<&str> = page.iter().map(|r| r.entry.user_id.as_str()).collect();
        // Ties broken by user_id ascending
        assert_eq!(ids, vec!["d", "a", "b", "c"]);

        let ranks: Vec<i64> = page.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 2, 4]);

        let second_page = top_players(&pool, 2, 2).await.unwrap();
        let ids: Vec<&str> = second_page.iter().map(|r| r.entry.user_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);

        assert_eq!(player_count(&pool).await.unwrap(), 4);
    }
}
