//! Session lifecycle rules on top of `SessionRepository`.
//!
//! Owns the behavior the storage layer should not have opinions about:
//! sequential free-form titling, the one-session-per-(user, date)
//! get-or-create, and transcript replacement filtering.

use tracing::{info, warn};

use standup_types::error::RepositoryError;
use standup_types::scrum::ScrumDraft;
use standup_types::session::{NewMessage, Session, SessionDetail};

use crate::session::store::SessionRepository;

/// Orchestrates session lifecycle and message persistence for one store.
///
/// Generic over [`SessionRepository`] so the rules are testable without a
/// database and the core crate never depends on the infra layer.
pub struct SessionService<R: SessionRepository> {
    repo: R,
}

impl<R: SessionRepository> SessionService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Access the underlying repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Create a free-form chat session titled `"Chat {n}"`.
    ///
    /// `n` is 1 + the caller's current session count -- a count, not a
    /// max+1, so deleting an early session can make a later title repeat.
    /// That numbering is intentional and pinned by tests.
    pub async fn create_freeform_session(&self, user_id: &str) -> Result<Session, RepositoryError> {
        let count = self.repo.count_sessions(user_id).await?;
        let title = format!("Chat {}", count + 1);
        let session = self.repo.create_session(user_id, &title, None).await?;
        info!(session_id = session.id, title = %session.title, "Created free-form session");
        Ok(session)
    }

    /// Find or create the caller's session for `draft.scrum_date` and
    /// persist the draft into its scrum update record.
    ///
    /// The second and every later call for the same date lands on the same
    /// session and overwrites the scrum record's fields in place. Two
    /// concurrent first calls are resolved by the storage uniqueness
    /// constraint: the loser observes [`RepositoryError::Conflict`] and
    /// retries as an update against the winner's row.
    pub async fn get_or_create_session_for_scrum_update(
        &self,
        user_id: &str,
        draft: &ScrumDraft,
    ) -> Result<Session, RepositoryError> {
        if let Some(session) = self
            .repo
            .find_session_by_scrum_date(user_id, draft.scrum_date)
            .await?
        {
            self.repo
                .upsert_scrum_update(user_id, session.id, draft)
                .await?;
            return Ok(session);
        }

        let title = format!("Scrum Update {}", draft.scrum_date.format("%Y-%m-%d"));
        match self.repo.create_session(user_id, &title, Some(draft.scrum_date)).await {
            Ok(session) => {
                self.repo
                    .upsert_scrum_update(user_id, session.id, draft)
                    .await?;
                info!(session_id = session.id, scrum_date = %draft.scrum_date, "Created scrum session");
                Ok(session)
            }
            Err(RepositoryError::Conflict(_)) => {
                // Lost the insert race; the winner's row is now visible.
                let session = self
                    .repo
                    .find_session_by_scrum_date(user_id, draft.scrum_date)
                    .await?
                    .ok_or_else(|| {
                        RepositoryError::Query(
                            "scrum session missing after uniqueness conflict".to_string(),
                        )
                    })?;
                self.repo
                    .upsert_scrum_update(user_id, session.id, draft)
                    .await?;
                Ok(session)
            }
            Err(e) => Err(e),
        }
    }

    /// List the caller's sessions, most recently updated first.
    pub async fn list_sessions(&self, user_id: &str) -> Result<Vec<Session>, RepositoryError> {
        self.repo.list_sessions(user_id).await
    }

    /// Get a session with ordered messages and its scrum update.
    pub async fn get_session(
        &self,
        user_id: &str,
        session_id: i64,
    ) -> Result<Option<SessionDetail>, RepositoryError> {
        self.repo.get_session(user_id, session_id).await
    }

    /// Append one message; silent no-op on a missing/foreign session.
    pub async fn append_message(
        &self,
        user_id: &str,
        session_id: i64,
        message: &NewMessage,
    ) -> Result<(), RepositoryError> {
        self.repo.append_message(user_id, session_id, message).await
    }

    /// Replace the session's full transcript.
    ///
    /// Entries whose content is empty or whitespace-only are dropped
    /// before they reach the store.
    pub async fn replace_messages(
        &self,
        user_id: &str,
        session_id: i64,
        messages: Vec<NewMessage>,
    ) -> Result<(), RepositoryError> {
        let kept: Vec<NewMessage> = messages
            .into_iter()
            .filter(|m| !m.content.trim().is_empty())
            .collect();
        self.repo.replace_messages(user_id, session_id, &kept).await
    }

    /// Delete a session and everything under it.
    pub async fn delete_session(&self, user_id: &str, session_id: i64) -> Result<(), RepositoryError> {
        self.repo.delete_session(user_id, session_id).await
    }

    /// Rename a session; silent no-op on a missing/foreign session.
    pub async fn rename_session(
        &self,
        user_id: &str,
        session_id: i64,
        title: &str,
    ) -> Result<(), RepositoryError> {
        if title.trim().is_empty() {
            warn!(session_id, "Ignoring rename to blank title");
            return Ok(());
        }
        self.repo.rename_session(user_id, session_id, title).await
    }
}
