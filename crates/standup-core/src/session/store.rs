//! SessionRepository trait definition.
//!
//! Provides the persistence primitives the `SessionService` composes into
//! the session lifecycle. Uses native async fn in traits (RPITIT, Rust
//! 2024 edition); implementations live in standup-infra
//! (e.g., `SqliteSessionRepository`).
//!
//! Every method takes the resolved caller id so tenant scoping happens in
//! the storage layer itself: an id owned by a different user behaves
//! exactly like a missing id. The repository performs no authentication
//! of its own -- the id is trusted as handed down by the identity
//! resolver.

use chrono::NaiveDate;

use standup_types::error::RepositoryError;
use standup_types::scrum::{DayWiseScrumUpdate, ScrumDraft};
use standup_types::session::{NewMessage, Session, SessionDetail};

/// Repository trait for chat session, message, and scrum update persistence.
pub trait SessionRepository: Send + Sync {
    /// Insert a new session row, creating the user row lazily if needed.
    ///
    /// When `scrum_date` is set and the caller already has a session for
    /// that date, the implementation must fail with
    /// [`RepositoryError::Conflict`] -- callers rely on the conflict to
    /// resolve the get-or-create race.
    fn create_session(
        &self,
        user_id: &str,
        title: &str,
        scrum_date: Option<NaiveDate>,
    ) -> impl std::future::Future<Output = Result<Session, RepositoryError>> + Send;

    /// Number of sessions the caller currently owns (dated or not).
    fn count_sessions(
        &self,
        user_id: &str,
    ) -> impl std::future::Future<Output = Result<i64, RepositoryError>> + Send;

    /// Look up the caller's session for a scrum date, if one exists.
    fn find_session_by_scrum_date(
        &self,
        user_id: &str,
        scrum_date: NaiveDate,
    ) -> impl std::future::Future<Output = Result<Option<Session>, RepositoryError>> + Send;

    /// Get a session with its messages ordered by (created_at, id)
    /// ascending and its scrum update if present.
    ///
    /// Returns `None` both when the id does not exist and when it belongs
    /// to another user.
    fn get_session(
        &self,
        user_id: &str,
        session_id: i64,
    ) -> impl std::future::Future<Output = Result<Option<SessionDetail>, RepositoryError>> + Send;

    /// List the caller's sessions ordered by updated_at DESC.
    fn list_sessions(
        &self,
        user_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<Session>, RepositoryError>> + Send;

    /// Append one message and bump the session's updated_at.
    ///
    /// Silent no-op when the session is missing or foreign.
    fn append_message(
        &self,
        user_id: &str,
        session_id: i64,
        message: &NewMessage,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete all messages for the session, then insert the given list in
    /// order, stamping each row at insertion time. Relative order must
    /// survive identical timestamps (identity tiebreak).
    ///
    /// Silent no-op when the session is missing or foreign.
    fn replace_messages(
        &self,
        user_id: &str,
        session_id: i64,
        messages: &[NewMessage],
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete a session, cascading to its messages and scrum update.
    ///
    /// Silent no-op when the session is missing or foreign.
    fn delete_session(
        &self,
        user_id: &str,
        session_id: i64,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Update a session's title and bump updated_at.
    ///
    /// Silent no-op when the session is missing or foreign.
    fn rename_session(
        &self,
        user_id: &str,
        session_id: i64,
        title: &str,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Create or fully overwrite the session's scrum update record and
    /// bump the session's updated_at. At most one record exists per
    /// session; the new draft's fields always win.
    fn upsert_scrum_update(
        &self,
        user_id: &str,
        session_id: i64,
        draft: &ScrumDraft,
    ) -> impl std::future::Future<Output = Result<DayWiseScrumUpdate, RepositoryError>> + Send;
}
