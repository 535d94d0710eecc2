//! Chat session and persisted message types.
//!
//! Sessions belong to exactly one user; a session with a `scrum_date` is
//! the unique session for that (user, date) pair, while free-form chats
//! carry `None` and may proliferate.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::chat::MessageRole;
use crate::scrum::{DayWiseScrumUpdate, MessageMetadata};

/// A chat session owned by a single user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    pub user_id: String,
    pub title: String,
    /// Set for scrum-update sessions, `None` for free-form chats.
    pub scrum_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A persisted message within a session.
///
/// Read order is (created_at, id) ascending -- the autoincrement id keeps
/// order deterministic when two messages land in the same instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: i64,
    pub session_id: i64,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

/// Input shape for appending or bulk-replacing messages.
///
/// Timestamps are never caller-supplied; the store stamps each row at
/// insertion time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

impl NewMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: MessageMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// A session together with its ordered messages and scrum update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDetail {
    #[serde(flatten)]
    pub session: Session,
    pub messages: Vec<StoredMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scrum_update: Option<DayWiseScrumUpdate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_serialize_optional_date() {
        let session = Session {
            id: 1,
            user_id: "acct-1".to_string(),
            title: "Chat 1".to_string(),
            scrum_date: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_string(&session).unwrap();
        assert!(json.contains("\"scrum_date\":null"));

        let dated = Session {
            scrum_date: NaiveDate::from_ymd_opt(2026, 8, 6),
            ..session
        };
        let json = serde_json::to_string(&dated).unwrap();
        assert!(json.contains("\"scrum_date\":\"2026-08-06\""));
    }

    #[test]
    fn test_new_message_builder() {
        let msg = NewMessage::new(MessageRole::User, "hi");
        assert!(msg.metadata.is_none());
        assert_eq!(msg.content, "hi");
    }

    #[test]
    fn test_stored_message_omits_empty_metadata() {
        let msg = StoredMessage {
            id: 7,
            session_id: 1,
            role: MessageRole::Assistant,
            content: "hello".to_string(),
            created_at: Utc::now(),
            metadata: None,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(!json.contains("metadata"));
    }
}
