//! Feed token linkage storage.
//!
//! One row per anonymous local user id, pointing at the externally
//! authenticated account plus the credentials the activity feed client
//! needs. The OAuth handshake that mints these records happens elsewhere;
//! this store only keeps and looks them up.

use chrono::{DateTime, Utc};
use sqlx::Row;

use standup_types::error::RepositoryError;

use super::pool::DatabasePool;

/// A stored external-account linkage.
#[derive(Debug, Clone)]
pub struct FeedToken {
    pub id: i64,
    pub local_user_id: String,
    pub authenticated_user_id: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub scope: String,
    pub cloud_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl FeedToken {
    /// Whether the access token is still usable at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Input shape for saving or refreshing a linkage.
#[derive(Debug, Clone)]
pub struct FeedTokenUpsert {
    pub local_user_id: String,
    pub authenticated_user_id: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub scope: String,
    pub cloud_id: Option<String>,
}

/// SQLite-backed feed token store.
pub struct SqliteFeedTokenStore {
    pool: DatabasePool,
}

impl SqliteFeedTokenStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Insert or overwrite the linkage for a local user id.
    pub async fn upsert_token(&self, token: &FeedTokenUpsert) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO feed_tokens
                   (local_user_id, authenticated_user_id, access_token, refresh_token,
                    expires_at, scope, cloud_id, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(local_user_id) DO UPDATE SET
                   authenticated_user_id = excluded.authenticated_user_id,
                   access_token = excluded.access_token,
                   refresh_token = excluded.refresh_token,
                   expires_at = excluded.expires_at,
                   scope = excluded.scope,
                   cloud_id = excluded.cloud_id,
                   updated_at = excluded.updated_at"#,
        )
        .bind(&token.local_user_id)
        .bind(&token.authenticated_user_id)
        .bind(&token.access_token)
        .bind(&token.refresh_token)
        .bind(token.expires_at.to_rfc3339())
        .bind(&token.scope)
        .bind(&token.cloud_id)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(())
    }

    /// Look up the linkage for an anonymous local user id.
    pub async fn find_by_local_user(
        &self,
        local_user_id: &str,
    ) -> Result<Option<FeedToken>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM feed_tokens WHERE local_user_id = ?")
            .bind(local_user_id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.map(|row| token_from_row(&row)).transpose()
    }

    /// Look up a linkage by the externally authenticated account id.
    pub async fn find_by_account(
        &self,
        authenticated_user_id: &str,
    ) -> Result<Option<FeedToken>, RepositoryError> {
        let row = sqlx::query(
            "SELECT * FROM feed_tokens WHERE authenticated_user_id = ? ORDER BY updated_at DESC LIMIT 1",
        )
        .bind(authenticated_user_id)
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.map(|row| token_from_row(&row)).transpose()
    }

    /// Remove the linkage for a local user id (disconnect).
    pub async fn delete_by_local_user(&self, local_user_id: &str) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM feed_tokens WHERE local_user_id = ?")
            .bind(local_user_id)
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(())
    }
}

fn token_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<FeedToken, RepositoryError> {
    let expires_at: String = row
        .try_get("expires_at")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let updated_at: String = row
        .try_get("updated_at")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

    Ok(FeedToken {
        id: row.try_get("id").map_err(|e| RepositoryError::Query(e.to_string()))?,
        local_user_id: row
            .try_get("local_user_id")
            .map_err(|e| RepositoryError::Query(e.to_string()))?,
        authenticated_user_id: row
            .try_get("authenticated_user_id")
            .map_err(|e| RepositoryError::Query(e.to_string()))?,
        access_token: row
            .try_get("access_token")
            .map_err(|e| RepositoryError::Query(e.to_string()))?,
        refresh_token: row
            .try_get("refresh_token")
            .map_err(|e| RepositoryError::Query(e.to_string()))?,
        expires_at: parse_datetime(&expires_at)?,
        scope: row.try_get("scope").map_err(|e| RepositoryError::Query(e.to_string()))?,
        cloud_id: row
            .try_get("cloud_id")
            .map_err(|e| RepositoryError::Query(e.to_string()))?,
        updated_at: parse_datetime(&updated_at)?,
    })
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}
