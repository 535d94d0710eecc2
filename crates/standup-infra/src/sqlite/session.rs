//! SQLite session repository implementation.
//!
//! Implements `SessionRepository` from `standup-core` using sqlx with
//! split read/write pools: raw queries, private Row structs, rfc3339 text
//! timestamps. Tenant scoping lives in the WHERE clauses -- a session id
//! owned by another user behaves exactly like a missing id.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::Row;

use standup_core::session::store::SessionRepository;
use standup_types::chat::MessageRole;
use standup_types::error::RepositoryError;
use standup_types::scrum::{DayWiseScrumUpdate, MessageMetadata, ScrumDraft};
use standup_types::session::{NewMessage, Session, SessionDetail, StoredMessage};

use super::pool::DatabasePool;

/// SQLite-backed implementation of `SessionRepository`.
pub struct SqliteSessionRepository {
    pool: DatabasePool,
}

impl SqliteSessionRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Lazily create the user row; every write path goes through this.
    async fn ensure_user(&self, user_id: &str) -> Result<(), RepositoryError> {
        sqlx::query("INSERT OR IGNORE INTO users (id, created_at) VALUES (?, ?)")
            .bind(user_id)
            .bind(format_datetime(&Utc::now()))
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(())
    }

    /// Whether the caller owns the given session.
    async fn owns_session(&self, user_id: &str, session_id: i64) -> Result<bool, RepositoryError> {
        let row = sqlx::query("SELECT id FROM chat_sessions WHERE id = ? AND user_id = ?")
            .bind(session_id)
            .bind(user_id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(row.is_some())
    }

    async fn touch_session(&self, session_id: i64) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE chat_sessions SET updated_at = ? WHERE id = ?")
            .bind(format_datetime(&Utc::now()))
            .bind(session_id)
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct SessionRow {
    id: i64,
    user_id: String,
    title: String,
    scrum_date: Option<String>,
    created_at: String,
    updated_at: String,
}

impl SessionRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            title: row.try_get("title")?,
            scrum_date: row.try_get("scrum_date")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_session(self) -> Result<Session, RepositoryError> {
        let scrum_date = self
            .scrum_date
            .as_deref()
            .map(parse_date)
            .transpose()?;
        Ok(Session {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            scrum_date,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

struct MessageRow {
    id: i64,
    session_id: i64,
    role: String,
    content: String,
    created_at: String,
    metadata: Option<String>,
}

impl MessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            session_id: row.try_get("session_id")?,
            role: row.try_get("role")?,
            content: row.try_get("content")?,
            created_at: row.try_get("created_at")?,
            metadata: row.try_get("metadata")?,
        })
    }

    fn into_message(self) -> Result<StoredMessage, RepositoryError> {
        let role: MessageRole = self
            .role
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;
        let metadata = self
            .metadata
            .as_deref()
            .map(|json| {
                serde_json::from_str::<MessageMetadata>(json)
                    .map_err(|e| RepositoryError::Query(format!("invalid message metadata: {e}")))
            })
            .transpose()?;

        Ok(StoredMessage {
            id: self.id,
            session_id: self.session_id,
            role,
            content: self.content,
            created_at: parse_datetime(&self.created_at)?,
            metadata,
        })
    }
}

struct ScrumUpdateRow {
    id: i64,
    session_id: i64,
    generated_at: String,
    yesterday: String,
    today: String,
    blocker: String,
}

impl ScrumUpdateRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            session_id: row.try_get("session_id")?,
            generated_at: row.try_get("generated_at")?,
            yesterday: row.try_get("yesterday")?,
            today: row.try_get("today")?,
            blocker: row.try_get("blocker")?,
        })
    }

    fn into_update(self) -> Result<DayWiseScrumUpdate, RepositoryError> {
        Ok(DayWiseScrumUpdate {
            id: self.id,
            session_id: self.session_id,
            generated_at: parse_datetime(&self.generated_at)?,
            yesterday: self.yesterday,
            today: self.today,
            blocker: self.blocker,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn parse_date(s: &str) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| RepositoryError::Query(format!("invalid scrum date: {e}")))
}

fn format_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn map_insert_error(e: sqlx::Error) -> RepositoryError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepositoryError::Conflict("chat_sessions(user_id, scrum_date)".to_string())
        }
        _ => RepositoryError::Query(e.to_string()),
    }
}

// ---------------------------------------------------------------------------
// SessionRepository implementation
// ---------------------------------------------------------------------------

impl SessionRepository for SqliteSessionRepository {
    async fn create_session(
        &self,
        user_id: &str,
        title: &str,
        scrum_date: Option<NaiveDate>,
    ) -> Result<Session, RepositoryError> {
        self.ensure_user(user_id).await?;

        let now = Utc::now();
        let result = sqlx::query(
            r#"INSERT INTO chat_sessions (user_id, title, scrum_date, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(user_id)
        .bind(title)
        .bind(scrum_date.as_ref().map(format_date))
        .bind(format_datetime(&now))
        .bind(format_datetime(&now))
        .execute(&self.pool.writer)
        .await
        .map_err(map_insert_error)?;

        Ok(Session {
            id: result.last_insert_rowid(),
            user_id: user_id.to_string(),
            title: title.to_string(),
            scrum_date,
            created_at: now,
            updated_at: now,
        })
    }

    async fn count_sessions(&self, user_id: &str) -> Result<i64, RepositoryError> {
        let row = sqlx::query("SELECT COUNT(*) as cnt FROM chat_sessions WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.try_get("cnt")
            .map_err(|e| RepositoryError::Query(e.to_string()))
    }

    async fn find_session_by_scrum_date(
        &self,
        user_id: &str,
        scrum_date: NaiveDate,
    ) -> Result<Option<Session>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM chat_sessions WHERE user_id = ? AND scrum_date = ?")
            .bind(user_id)
            .bind(format_date(&scrum_date))
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let session_row = SessionRow::from_row(&row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(session_row.into_session()?))
            }
            None => Ok(None),
        }
    }

    async fn get_session(
        &self,
        user_id: &str,
        session_id: i64,
    ) -> Result<Option<SessionDetail>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM chat_sessions WHERE id = ? AND user_id = ?")
            .bind(session_id)
            .bind(user_id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let session = SessionRow::from_row(&row)
            .map_err(|e| RepositoryError::Query(e.to_string()))?
            .into_session()?;

        // Identity tiebreak keeps order deterministic when timestamps are equal.
        let message_rows = sqlx::query(
            "SELECT * FROM chat_messages WHERE session_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut messages = Vec::with_capacity(message_rows.len());
        for row in &message_rows {
            let msg_row =
                MessageRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            messages.push(msg_row.into_message()?);
        }

        let update_row = sqlx::query("SELECT * FROM scrum_updates WHERE session_id = ?")
            .bind(session_id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let scrum_update = match update_row {
            Some(row) => Some(
                ScrumUpdateRow::from_row(&row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?
                    .into_update()?,
            ),
            None => None,
        };

        Ok(Some(SessionDetail {
            session,
            messages,
            scrum_update,
        }))
    }

    async fn list_sessions(&self, user_id: &str) -> Result<Vec<Session>, RepositoryError> {
        let rows =
            sqlx::query("SELECT * FROM chat_sessions WHERE user_id = ? ORDER BY updated_at DESC")
                .bind(user_id)
                .fetch_all(&self.pool.reader)
                .await
                .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut sessions = Vec::with_capacity(rows.len());
        for row in &rows {
            let session_row =
                SessionRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            sessions.push(session_row.into_session()?);
        }

        Ok(sessions)
    }

    async fn append_message(
        &self,
        user_id: &str,
        session_id: i64,
        message: &NewMessage,
    ) -> Result<(), RepositoryError> {
        if !self.owns_session(user_id, session_id).await? {
            tracing::warn!(session_id, "Append to missing or foreign session ignored");
            return Ok(());
        }

        let metadata = message
            .metadata
            .as_ref()
            .map(|m| serde_json::to_string(m))
            .transpose()
            .map_err(|e| RepositoryError::Query(format!("metadata serialization: {e}")))?;

        sqlx::query(
            r#"INSERT INTO chat_messages (session_id, user_id, role, content, created_at, metadata)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(session_id)
        .bind(user_id)
        .bind(message.role.to_string())
        .bind(&message.content)
        .bind(format_datetime(&Utc::now()))
        .bind(metadata)
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        self.touch_session(session_id).await
    }

    async fn replace_messages(
        &self,
        user_id: &str,
        session_id: i64,
        messages: &[NewMessage],
    ) -> Result<(), RepositoryError> {
        if !self.owns_session(user_id, session_id).await? {
            tracing::warn!(session_id, "Replace on missing or foreign session ignored");
            return Ok(());
        }

        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        sqlx::query("DELETE FROM chat_messages WHERE session_id = ?")
            .bind(session_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        // One shared timestamp for the whole batch; insertion order is
        // preserved by the autoincrement id.
        let now = format_datetime(&Utc::now());
        for message in messages {
            let metadata = message
                .metadata
                .as_ref()
                .map(|m| serde_json::to_string(m))
                .transpose()
                .map_err(|e| RepositoryError::Query(format!("metadata serialization: {e}")))?;

            sqlx::query(
                r#"INSERT INTO chat_messages (session_id, user_id, role, content, created_at, metadata)
                   VALUES (?, ?, ?, ?, ?, ?)"#,
            )
            .bind(session_id)
            .bind(user_id)
            .bind(message.role.to_string())
            .bind(&message.content)
            .bind(&now)
            .bind(metadata)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        }

        sqlx::query("UPDATE chat_sessions SET updated_at = ? WHERE id = ?")
            .bind(&now)
            .bind(session_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))
    }

    async fn delete_session(&self, user_id: &str, session_id: i64) -> Result<(), RepositoryError> {
        // Cascades to chat_messages and scrum_updates via foreign keys.
        sqlx::query("DELETE FROM chat_sessions WHERE id = ? AND user_id = ?")
            .bind(session_id)
            .bind(user_id)
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(())
    }

    async fn rename_session(
        &self,
        user_id: &str,
        session_id: i64,
        title: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE chat_sessions SET title = ?, updated_at = ? WHERE id = ? AND user_id = ?",
        )
        .bind(title)
        .bind(format_datetime(&Utc::now()))
        .bind(session_id)
        .bind(user_id)
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(())
    }

    async fn upsert_scrum_update(
        &self,
        user_id: &str,
        session_id: i64,
        draft: &ScrumDraft,
    ) -> Result<DayWiseScrumUpdate, RepositoryError> {
        if !self.owns_session(user_id, session_id).await? {
            return Err(RepositoryError::NotFound);
        }

        // Full overwrite on conflict: the new draft's fields always win.
        sqlx::query(
            r#"INSERT INTO scrum_updates (session_id, user_id, generated_at, yesterday, today, blocker)
               VALUES (?, ?, ?, ?, ?, ?)
               ON CONFLICT(session_id) DO UPDATE SET
                   generated_at = excluded.generated_at,
                   yesterday = excluded.yesterday,
                   today = excluded.today,
                   blocker = excluded.blocker"#,
        )
        .bind(session_id)
        .bind(user_id)
        .bind(format_datetime(&draft.generated_at))
        .bind(&draft.yesterday)
        .bind(&draft.today)
        .bind(&draft.blocker)
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        self.touch_session(session_id).await?;

        let row = sqlx::query("SELECT * FROM scrum_updates WHERE session_id = ?")
            .bind(session_id)
            .fetch_one(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        ScrumUpdateRow::from_row(&row)
            .map_err(|e| RepositoryError::Query(e.to_string()))?
            .into_update()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use standup_core::chat::dummy::DummyChatClient;
    use standup_core::chat::orchestrator::ChatOrchestrator;
    use standup_core::scrum::generator::{CannedScrumGenerator, GenerationSequence};
    use standup_core::session::service::SessionService;
    use standup_types::chat::ChatTurn;

    async fn test_pool() -> DatabasePool {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        // Leak tempdir so it lives for the test
        std::mem::forget(dir);
        DatabasePool::new(&url).await.unwrap()
    }

    fn make_draft(date: NaiveDate, tag: &str) -> ScrumDraft {
        ScrumDraft {
            scrum_date: date,
            generated_at: Utc::now(),
            yesterday: format!("Yesterday {tag}"),
            today: format!("Today {tag}"),
            blocker: format!("Blocker {tag}"),
        }
    }

    fn aug6() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 6).unwrap()
    }

    async fn message_count(pool: &DatabasePool, session_id: i64) -> i64 {
        let row = sqlx::query("SELECT COUNT(*) as cnt FROM chat_messages WHERE session_id = ?")
            .bind(session_id)
            .fetch_one(&pool.reader)
            .await
            .unwrap();
        row.try_get("cnt").unwrap()
    }

    async fn scrum_update_count(pool: &DatabasePool) -> i64 {
        let row = sqlx::query("SELECT COUNT(*) as cnt FROM scrum_updates")
            .fetch_one(&pool.reader)
            .await
            .unwrap();
        row.try_get("cnt").unwrap()
    }

    #[tokio::test]
    async fn test_freeform_titles_count_in_call_order() {
        let pool = test_pool().await;
        let service = SessionService::new(SqliteSessionRepository::new(pool));

        for expected in ["Chat 1", "Chat 2", "Chat 3"] {
            let session = service.create_freeform_session("u1").await.unwrap();
            assert_eq!(session.title, expected);
        }
    }

    #[tokio::test]
    async fn test_get_or_create_same_date_is_idempotent() {
        let pool = test_pool().await;
        let service = SessionService::new(SqliteSessionRepository::new(pool.clone()));

        let first = service
            .get_or_create_session_for_scrum_update("u1", &make_draft(aug6(), "a"))
            .await
            .unwrap();
        let second = service
            .get_or_create_session_for_scrum_update("u1", &make_draft(aug6(), "b"))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.title, "Scrum Update 2026-08-06");

        let sessions = service.list_sessions("u1").await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(scrum_update_count(&pool).await, 1);

        // Second call's field values win.
        let detail = service.get_session("u1", first.id).await.unwrap().unwrap();
        let update = detail.scrum_update.unwrap();
        assert_eq!(update.yesterday, "Yesterday b");
        assert_eq!(update.today, "Today b");
        assert_eq!(update.blocker, "Blocker b");
    }

    #[tokio::test]
    async fn test_duplicate_dated_insert_maps_to_conflict() {
        let pool = test_pool().await;
        let repo = SqliteSessionRepository::new(pool);

        repo.create_session("u1", "Scrum Update 2026-08-06", Some(aug6()))
            .await
            .unwrap();
        let err = repo
            .create_session("u1", "Scrum Update 2026-08-06", Some(aug6()))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_two_users_same_date_are_isolated() {
        let pool = test_pool().await;
        let service = SessionService::new(SqliteSessionRepository::new(pool));

        let a = service
            .get_or_create_session_for_scrum_update("alice", &make_draft(aug6(), "a"))
            .await
            .unwrap();
        let b = service
            .get_or_create_session_for_scrum_update("bob", &make_draft(aug6(), "b"))
            .await
            .unwrap();

        assert_ne!(a.id, b.id);

        let alice_sessions = service.list_sessions("alice").await.unwrap();
        assert_eq!(alice_sessions.len(), 1);
        assert_eq!(alice_sessions[0].id, a.id);

        let bob_sessions = service.list_sessions("bob").await.unwrap();
        assert_eq!(bob_sessions.len(), 1);
        assert_eq!(bob_sessions[0].id, b.id);
    }

    #[tokio::test]
    async fn test_replace_messages_replaces_in_order() {
        let pool = test_pool().await;
        let service = SessionService::new(SqliteSessionRepository::new(pool));
        let session = service.create_freeform_session("u1").await.unwrap();

        service
            .replace_messages(
                "u1",
                session.id,
                vec![NewMessage::new(MessageRole::User, "First")],
            )
            .await
            .unwrap();

        service
            .replace_messages(
                "u1",
                session.id,
                vec![
                    NewMessage::new(MessageRole::User, "Second"),
                    NewMessage::new(MessageRole::Assistant, "Reply"),
                ],
            )
            .await
            .unwrap();

        let detail = service.get_session("u1", session.id).await.unwrap().unwrap();
        let pairs: Vec<(String, &str)> = detail
            .messages
            .iter()
            .map(|m| (m.role.to_string(), m.content.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("user".to_string(), "Second"),
                ("assistant".to_string(), "Reply")
            ]
        );
    }

    #[tokio::test]
    async fn test_replace_skips_whitespace_only_entries() {
        let pool = test_pool().await;
        let service = SessionService::new(SqliteSessionRepository::new(pool));
        let session = service.create_freeform_session("u1").await.unwrap();

        service
            .replace_messages(
                "u1",
                session.id,
                vec![
                    NewMessage::new(MessageRole::User, "keep me"),
                    NewMessage::new(MessageRole::Assistant, "   \t "),
                    NewMessage::new(MessageRole::Assistant, ""),
                ],
            )
            .await
            .unwrap();

        let detail = service.get_session("u1", session.id).await.unwrap().unwrap();
        assert_eq!(detail.messages.len(), 1);
        assert_eq!(detail.messages[0].content, "keep me");
    }

    #[tokio::test]
    async fn test_identical_timestamps_read_back_in_insert_order() {
        let pool = test_pool().await;
        let service = SessionService::new(SqliteSessionRepository::new(pool));
        let session = service.create_freeform_session("u1").await.unwrap();

        // replace_messages stamps the whole batch with one timestamp, so
        // ordering can only come from the id tiebreak.
        let contents: Vec<String> = (0..10).map(|n| format!("message {n}")).collect();
        service
            .replace_messages(
                "u1",
                session.id,
                contents
                    .iter()
                    .map(|c| NewMessage::new(MessageRole::User, c.clone()))
                    .collect(),
            )
            .await
            .unwrap();

        let detail = service.get_session("u1", session.id).await.unwrap().unwrap();
        let stamps: Vec<_> = detail.messages.iter().map(|m| m.created_at).collect();
        assert!(stamps.windows(2).all(|w| w[0] == w[1]), "batch shares one timestamp");

        let read_back: Vec<&str> = detail.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(read_back, contents.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_foreign_session_reads_as_not_found() {
        let pool = test_pool().await;
        let service = SessionService::new(SqliteSessionRepository::new(pool));

        let session = service.create_freeform_session("alice").await.unwrap();
        assert!(service.get_session("mallory", session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_foreign_append_is_silent_noop() {
        let pool = test_pool().await;
        let service = SessionService::new(SqliteSessionRepository::new(pool.clone()));

        let session = service.create_freeform_session("alice").await.unwrap();
        service
            .append_message(
                "mallory",
                session.id,
                &NewMessage::new(MessageRole::User, "sneaky"),
            )
            .await
            .unwrap();

        assert_eq!(message_count(&pool, session.id).await, 0);
    }

    #[tokio::test]
    async fn test_foreign_replace_delete_rename_are_noops() {
        let pool = test_pool().await;
        let service = SessionService::new(SqliteSessionRepository::new(pool.clone()));

        let session = service.create_freeform_session("alice").await.unwrap();
        service
            .append_message("alice", session.id, &NewMessage::new(MessageRole::User, "mine"))
            .await
            .unwrap();

        service
            .replace_messages(
                "mallory",
                session.id,
                vec![NewMessage::new(MessageRole::User, "overwrite")],
            )
            .await
            .unwrap();
        service.delete_session("mallory", session.id).await.unwrap();
        service.rename_session("mallory", session.id, "pwned").await.unwrap();

        let detail = service.get_session("alice", session.id).await.unwrap().unwrap();
        assert_eq!(detail.session.title, "Chat 1");
        assert_eq!(detail.messages.len(), 1);
        assert_eq!(detail.messages[0].content, "mine");
    }

    #[tokio::test]
    async fn test_delete_cascades_to_children() {
        let pool = test_pool().await;
        let service = SessionService::new(SqliteSessionRepository::new(pool.clone()));

        let session = service
            .get_or_create_session_for_scrum_update("u1", &make_draft(aug6(), "x"))
            .await
            .unwrap();
        service
            .append_message("u1", session.id, &NewMessage::new(MessageRole::User, "hello"))
            .await
            .unwrap();

        service.delete_session("u1", session.id).await.unwrap();

        assert!(service.get_session("u1", session.id).await.unwrap().is_none());
        assert_eq!(message_count(&pool, session.id).await, 0);
        assert_eq!(scrum_update_count(&pool).await, 0);
    }

    #[tokio::test]
    async fn test_rename_updates_title_and_list_order() {
        let pool = test_pool().await;
        let service = SessionService::new(SqliteSessionRepository::new(pool));

        let first = service.create_freeform_session("u1").await.unwrap();
        let _second = service.create_freeform_session("u1").await.unwrap();

        // Sleep past rfc3339 precision so the rename visibly reorders.
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        service.rename_session("u1", first.id, "Planning notes").await.unwrap();

        let sessions = service.list_sessions("u1").await.unwrap();
        assert_eq!(sessions[0].id, first.id);
        assert_eq!(sessions[0].title, "Planning notes");
    }

    #[tokio::test]
    async fn test_metadata_survives_storage_roundtrip() {
        let pool = test_pool().await;
        let service = SessionService::new(SqliteSessionRepository::new(pool));
        let session = service.create_freeform_session("u1").await.unwrap();

        let draft = make_draft(aug6(), "meta");
        let metadata = MessageMetadata::ScrumGeneration {
            scrum_update: draft.clone(),
            captured_at: Utc::now(),
        };
        service
            .append_message(
                "u1",
                session.id,
                &NewMessage::new(MessageRole::Assistant, "block").with_metadata(metadata),
            )
            .await
            .unwrap();

        let detail = service.get_session("u1", session.id).await.unwrap().unwrap();
        match &detail.messages[0].metadata {
            Some(MessageMetadata::ScrumGeneration { scrum_update, .. }) => {
                assert_eq!(scrum_update, &draft);
            }
            other => panic!("expected scrum metadata, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_workflow_scrum_then_regenerate_over_sqlite() {
        // End-to-end over the real store: mirror of the conversational
        // flow the UI drives.
        let pool = test_pool().await;
        let sequence = GenerationSequence::new();
        let orch = ChatOrchestrator::new(
            DummyChatClient::new(sequence.clone()),
            CannedScrumGenerator::new(sequence),
            SessionService::new(SqliteSessionRepository::new(pool.clone())),
        );

        let none = orch.run_turn("u1", &[], None, "hi").await.unwrap();
        assert!(none.session.is_none());
        assert!(orch.sessions().list_sessions("u1").await.unwrap().is_empty());

        let mut transcript: Vec<ChatTurn> = vec![ChatTurn::user("hi"), ChatTurn::assistant(none.assistant_text)];

        let first = orch
            .run_turn("u1", &transcript, None, "scrum update")
            .await
            .unwrap();
        let session = first.session.clone().unwrap();
        transcript.push(ChatTurn::user("scrum update"));
        transcript.push(ChatTurn::assistant(first.assistant_text));

        let second = orch
            .run_turn("u1", &transcript, Some(session.id), "regenerate")
            .await
            .unwrap();
        assert_eq!(second.session.unwrap().id, session.id);

        let detail = orch.sessions().get_session("u1", session.id).await.unwrap().unwrap();
        assert_eq!(detail.messages.len(), 6);
        assert!(detail.messages[3].content.starts_with("Scrum update for "));
        assert!(detail.messages[5].content.starts_with("Scrum update for "));
        assert_ne!(detail.messages[3].content, detail.messages[5].content);

        let update = detail.scrum_update.unwrap();
        assert!(detail.messages[5].content.contains(&update.yesterday));
        assert_eq!(scrum_update_count(&pool).await, 1);
    }
}
