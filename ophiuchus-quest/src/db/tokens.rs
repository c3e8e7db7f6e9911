//! Bearer token lookup
//!
//! Tokens are issued and refreshed by the external identity provider;
//! this service only validates presented tokens and reads the identity
//! and catalog credential they carry.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use ophiuchus_common::{Error, Result};

/// A stored identity token
#[derive(Debug, Clone)]
pub struct AuthToken {
    pub token: String,
    pub user_id: String,
    pub username: String,
    pub spotify_user_id: String,
    /// Bearer credential for the track oracle
    pub oracle_bearer: String,
    pub expires_at: DateTime<Utc>,
}

impl AuthToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Look up a presented bearer token
pub async fn lookup_token(pool: &SqlitePool, token: &str) -> Result<Option<AuthToken>> {
    let row = sqlx::query(
        r#"
        SELECT token, user_id, username, spotify_user_id, oracle_bearer, expires_at
        FROM auth_tokens
        WHERE token = ?
        "#,
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let expires_at: String = row.get("expires_at");
            let expires_at = chrono::DateTime::parse_from_rfc3339(&expires_at)
                .map_err(|e| Error::Internal(format!("Failed to parse expires_at: {}", e)))?
                .with_timezone(&Utc);

            Ok(Some(AuthToken {
                token: row.get("token"),
                user_id: row.get("user_id"),
                username: row.get("username"),
                spotify_user_id: row.get("spotify_user_id"),
                oracle_bearer: row.get("oracle_bearer"),
                expires_at,
            }))
        }
        None => Ok(None),
    }
}

/// Store a token (used by the identity provider sync and by tests)
pub async fn insert_token(pool: &SqlitePool, token: &AuthToken) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO auth_tokens (
            token, user_id, username, spotify_user_id, oracle_bearer, expires_at
        ) VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(token) DO UPDATE SET
            user_id = excluded.user_id,
            username = excluded.username,
            spotify_user_id = excluded.spotify_user_id,
            oracle_bearer = excluded.oracle_bearer,
            expires_at = excluded.expires_at
        "#,
    )
    .bind(&token.token)
    .bind(&token.user_id)
    .bind(&token.username)
    .bind(&token.spotify_user_id)
    .bind(&token.oracle_bearer)
    .bind(token.expires_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use ophiuchus_common::db::create_tables;

    #[tokio::test]
    async fn test_lookup_and_expiry() {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        create_tables(&pool).await.unwrap();

        let now = Utc::now();
        let token = AuthToken {
            token: "tok-1".to_string(),
            user_id: "u1".to_string(),
            username: "player one".to_string(),
            spotify_user_id: "sp1".to_string(),
            oracle_bearer: "oracle-bearer".to_string(),
            expires_at: now + Duration::hours(1),
        };
        insert_token(&pool, &token).await.unwrap();

        let loaded = lookup_token(&pool, "tok-1").await.unwrap().unwrap();
        assert_eq!(loaded.user_id, "u1");
        assert!(!loaded.is_expired(now));
        assert!(loaded.is_expired(now + Duration::hours(2)));

        assert!(lookup_token(&pool, "unknown").await.unwrap().is_none());
    }
}
