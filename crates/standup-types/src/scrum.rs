//! Scrum update draft and persisted scrum record types.
//!
//! A [`ScrumDraft`] is a generated candidate that may or may not be
//! persisted; [`DayWiseScrumUpdate`] is the at-most-one-per-session row
//! the store keeps once a draft lands.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A generated scrum-update candidate.
///
/// All three text fields are required and non-empty once a draft exists;
/// generators are responsible for substituting their fixed default
/// sentences rather than emitting blanks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrumDraft {
    /// Calendar date the update is for (UTC).
    pub scrum_date: NaiveDate,
    /// When the draft was generated.
    pub generated_at: DateTime<Utc>,
    pub yesterday: String,
    pub today: String,
    pub blocker: String,
}

/// The persisted scrum update attached to a chat session.
///
/// Exactly 0 or 1 exist per session; regeneration for the same date
/// overwrites the fields in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayWiseScrumUpdate {
    pub id: i64,
    pub session_id: i64,
    pub generated_at: DateTime<Utc>,
    pub yesterday: String,
    pub today: String,
    pub blocker: String,
}

/// Opaque per-message metadata payload.
///
/// Modeled as a tagged union rather than an open hierarchy: future
/// payload kinds are additional variants, each with its own `type` tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MessageMetadata {
    /// A scrum-update draft captured from this message.
    ScrumGeneration {
        scrum_update: ScrumDraft,
        captured_at: DateTime<Utc>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> ScrumDraft {
        ScrumDraft {
            scrum_date: NaiveDate::from_ymd_opt(2026, 8, 6).unwrap(),
            generated_at: Utc::now(),
            yesterday: "Shipped the session store.".to_string(),
            today: "Wire the draft generator.".to_string(),
            blocker: "No blocker.".to_string(),
        }
    }

    #[test]
    fn test_draft_json_roundtrip() {
        let d = draft();
        let json = serde_json::to_string(&d).unwrap();
        let parsed: ScrumDraft = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, d);
    }

    #[test]
    fn test_metadata_discriminator() {
        let meta = MessageMetadata::ScrumGeneration {
            scrum_update: draft(),
            captured_at: Utc::now(),
        };
        let json = serde_json::to_string(&meta).unwrap();
        assert!(json.contains("\"type\":\"scrum-generation\""));

        let parsed: MessageMetadata = serde_json::from_str(&json).unwrap();
        assert!(matches!(parsed, MessageMetadata::ScrumGeneration { .. }));
    }

    #[test]
    fn test_metadata_rejects_unknown_tag() {
        let result: Result<MessageMetadata, _> =
            serde_json::from_str(r#"{"type":"unknown-kind","payload":1}"#);
        assert!(result.is_err());
    }
}
