//! Activity feed types.
//!
//! The activity feed is an external collaborator supplying the caller's
//! recent tracker activity (active items, logged time, comments, field
//! changes) within a bounded date window. The shapes here are
//! provider-agnostic; the Jira-backed client in the infra layer maps its
//! wire format into them.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The date window an activity fetch is bounded to.
///
/// Covers [yesterday 00:00 UTC, today+1 00:00 UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityWindow {
    pub yesterday: NaiveDate,
    pub today: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ActivityWindow {
    /// Build the yesterday/today window around the given instant.
    pub fn around(now: DateTime<Utc>) -> Self {
        let today = now.date_naive();
        let yesterday = today - Duration::days(1);
        Self {
            yesterday,
            today,
            start: yesterday.and_hms_opt(0, 0, 0).expect("midnight is valid").and_utc(),
            end: (today + Duration::days(1))
                .and_hms_opt(0, 0, 0)
                .expect("midnight is valid")
                .and_utc(),
        }
    }
}

/// An issue/work item the caller currently has in flight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveItem {
    pub key: String,
    pub summary: String,
    pub status: String,
    pub updated_at: DateTime<Utc>,
    pub project: String,
}

/// A time-logged entry authored by some user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeLogEntry {
    pub item_key: String,
    pub item_summary: String,
    pub author_id: String,
    pub started_at: DateTime<Utc>,
    pub seconds_spent: i64,
    pub comment: String,
}

/// A comment authored by some user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentEntry {
    pub item_key: String,
    pub item_summary: String,
    pub author_id: String,
    pub created_at: DateTime<Utc>,
    pub body: String,
}

/// A single field transition recorded in an item's change history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldChangeEntry {
    pub item_key: String,
    pub item_summary: String,
    pub author_id: String,
    pub changed_at: DateTime<Utc>,
    pub field: String,
    pub from_value: String,
    pub to_value: String,
}

/// Everything fetched for one caller within one window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityContext {
    pub generated_at: DateTime<Utc>,
    pub window: ActivityWindow,
    pub active_items: Vec<ActiveItem>,
    pub time_logs: Vec<TimeLogEntry>,
    pub comments: Vec<CommentEntry>,
    pub field_changes: Vec<FieldChangeEntry>,
}

impl ActivityContext {
    /// An empty context for the given window.
    pub fn empty(generated_at: DateTime<Utc>, window: ActivityWindow) -> Self {
        Self {
            generated_at,
            window,
            active_items: Vec::new(),
            time_logs: Vec::new(),
            comments: Vec::new(),
            field_changes: Vec::new(),
        }
    }
}
