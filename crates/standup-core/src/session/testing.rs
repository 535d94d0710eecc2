//! In-memory `SessionRepository` used by core unit tests.
//!
//! Mirrors the storage contract closely enough to exercise the lifecycle
//! rules: per-user scoping, the (user, scrum_date) uniqueness conflict,
//! insertion-order read-back, and cascading deletes.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{NaiveDate, Utc};

use standup_types::error::RepositoryError;
use standup_types::scrum::{DayWiseScrumUpdate, ScrumDraft};
use standup_types::session::{NewMessage, Session, SessionDetail, StoredMessage};

use crate::session::store::SessionRepository;

#[derive(Default)]
struct Inner {
    sessions: Vec<Session>,
    messages: Vec<StoredMessage>,
    scrum_updates: Vec<(String, DayWiseScrumUpdate)>,
    next_session_id: i64,
    next_message_id: i64,
    next_update_id: i64,
}

pub(crate) struct MemorySessionRepository {
    inner: Mutex<Inner>,
    conflict_once: AtomicBool,
}

impl MemorySessionRepository {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            conflict_once: AtomicBool::new(false),
        }
    }

    /// Make the next dated insert behave as if a concurrent request won
    /// the race: the row appears, but the caller sees a conflict.
    pub(crate) fn inject_conflict_once(&self) {
        self.conflict_once.store(true, Ordering::SeqCst);
    }

    fn owned_session(inner: &Inner, user_id: &str, session_id: i64) -> Option<usize> {
        inner
            .sessions
            .iter()
            .position(|s| s.id == session_id && s.user_id == user_id)
    }
}

impl SessionRepository for MemorySessionRepository {
    async fn create_session(
        &self,
        user_id: &str,
        title: &str,
        scrum_date: Option<NaiveDate>,
    ) -> Result<Session, RepositoryError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(date) = scrum_date {
            let exists = inner
                .sessions
                .iter()
                .any(|s| s.user_id == user_id && s.scrum_date == Some(date));
            if exists {
                return Err(RepositoryError::Conflict("chat_sessions.scrum_date".to_string()));
            }
        }

        inner.next_session_id += 1;
        let now = Utc::now();
        let session = Session {
            id: inner.next_session_id,
            user_id: user_id.to_string(),
            title: title.to_string(),
            scrum_date,
            created_at: now,
            updated_at: now,
        };
        inner.sessions.push(session.clone());

        if scrum_date.is_some() && self.conflict_once.swap(false, Ordering::SeqCst) {
            return Err(RepositoryError::Conflict("chat_sessions.scrum_date".to_string()));
        }
        Ok(session)
    }

    async fn count_sessions(&self, user_id: &str) -> Result<i64, RepositoryError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.sessions.iter().filter(|s| s.user_id == user_id).count() as i64)
    }

    async fn find_session_by_scrum_date(
        &self,
        user_id: &str,
        scrum_date: NaiveDate,
    ) -> Result<Option<Session>, RepositoryError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .sessions
            .iter()
            .find(|s| s.user_id == user_id && s.scrum_date == Some(scrum_date))
            .cloned())
    }

    async fn get_session(
        &self,
        user_id: &str,
        session_id: i64,
    ) -> Result<Option<SessionDetail>, RepositoryError> {
        let inner = self.inner.lock().unwrap();
        let Some(idx) = Self::owned_session(&inner, user_id, session_id) else {
            return Ok(None);
        };
        let session = inner.sessions[idx].clone();

        let mut messages: Vec<StoredMessage> = inner
            .messages
            .iter()
            .filter(|m| m.session_id == session_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| (m.created_at, m.id));

        let scrum_update = inner
            .scrum_updates
            .iter()
            .find(|(_, u)| u.session_id == session_id)
            .map(|(_, u)| u.clone());

        Ok(Some(SessionDetail {
            session,
            messages,
            scrum_update,
        }))
    }

    async fn list_sessions(&self, user_id: &str) -> Result<Vec<Session>, RepositoryError> {
        let inner = self.inner.lock().unwrap();
        let mut sessions: Vec<Session> = inner
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(sessions)
    }

    async fn append_message(
        &self,
        user_id: &str,
        session_id: i64,
        message: &NewMessage,
    ) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(idx) = Self::owned_session(&inner, user_id, session_id) else {
            return Ok(());
        };
        inner.next_message_id += 1;
        let id = inner.next_message_id;
        let now = Utc::now();
        inner.messages.push(StoredMessage {
            id,
            session_id,
            role: message.role,
            content: message.content.clone(),
            created_at: now,
            metadata: message.metadata.clone(),
        });
        inner.sessions[idx].updated_at = now;
        Ok(())
    }

    async fn replace_messages(
        &self,
        user_id: &str,
        session_id: i64,
        messages: &[NewMessage],
    ) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(idx) = Self::owned_session(&inner, user_id, session_id) else {
            return Ok(());
        };
        inner.messages.retain(|m| m.session_id != session_id);
        let now = Utc::now();
        for message in messages {
            inner.next_message_id += 1;
            let id = inner.next_message_id;
            inner.messages.push(StoredMessage {
                id,
                session_id,
                role: message.role,
                content: message.content.clone(),
                created_at: now,
                metadata: message.metadata.clone(),
            });
        }
        inner.sessions[idx].updated_at = now;
        Ok(())
    }

    async fn delete_session(&self, user_id: &str, session_id: i64) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock().unwrap();
        if Self::owned_session(&inner, user_id, session_id).is_none() {
            return Ok(());
        }
        inner.sessions.retain(|s| s.id != session_id);
        inner.messages.retain(|m| m.session_id != session_id);
        inner.scrum_updates.retain(|(_, u)| u.session_id != session_id);
        Ok(())
    }

    async fn rename_session(
        &self,
        user_id: &str,
        session_id: i64,
        title: &str,
    ) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(idx) = Self::owned_session(&inner, user_id, session_id) else {
            return Ok(());
        };
        inner.sessions[idx].title = title.to_string();
        inner.sessions[idx].updated_at = Utc::now();
        Ok(())
    }

    async fn upsert_scrum_update(
        &self,
        user_id: &str,
        session_id: i64,
        draft: &ScrumDraft,
    ) -> Result<DayWiseScrumUpdate, RepositoryError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(idx) = Self::owned_session(&inner, user_id, session_id) else {
            return Err(RepositoryError::NotFound);
        };
        inner.sessions[idx].updated_at = Utc::now();

        if let Some((_, existing)) = inner
            .scrum_updates
            .iter_mut()
            .find(|(_, u)| u.session_id == session_id)
        {
            existing.generated_at = draft.generated_at;
            existing.yesterday = draft.yesterday.clone();
            existing.today = draft.today.clone();
            existing.blocker = draft.blocker.clone();
            return Ok(existing.clone());
        }

        inner.next_update_id += 1;
        let update = DayWiseScrumUpdate {
            id: inner.next_update_id,
            session_id,
            generated_at: draft.generated_at,
            yesterday: draft.yesterday.clone(),
            today: draft.today.clone(),
            blocker: draft.blocker.clone(),
        };
        inner
            .scrum_updates
            .push((user_id.to_string(), update.clone()));
        Ok(update)
    }
}
