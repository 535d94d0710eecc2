//! Scrum draft generation strategies.
//!
//! [`CannedScrumGenerator`] turns an explicit command into a rotating
//! deterministic draft; [`FeedScrumGenerator`] synthesizes one from the
//! caller's external activity feed. Both sit behind
//! [`ScrumUpdateGenerator`], so the orchestrator does not care which is
//! wired in.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tracing::{debug, warn};

use standup_types::feed::{ActivityContext, ActivityWindow};
use standup_types::scrum::ScrumDraft;

use crate::feed::ActivityFeed;

/// Fixed fallback line when the feed shows nothing for yesterday.
const NO_ACTIVITY_YESTERDAY: &str = "No activity found yesterday.";
/// Fixed fallback line when nothing is planned from the feed.
const CONTINUE_ACTIVE_WORK: &str = "Continue work on active items.";
/// The feed-backed variant never infers blockers.
const NO_BLOCKER: &str = "No blocker.";

/// Maximum number of feed items folded into one draft field.
const MAX_ITEMS_PER_FIELD: usize = 8;
/// Feed entry text is cut to this many characters.
const ITEM_TEXT_LIMIT: usize = 80;

/// Strategy capability: decide whether the latest user-authored text asks
/// for a scrum update and, if so, produce a draft.
///
/// `None` means "no draft" -- either the text was not a scrum command or
/// the backing source was unavailable. Implementations never fail hard.
pub trait ScrumUpdateGenerator: Send + Sync {
    fn draft_for_message(
        &self,
        user_id: &str,
        user_message: &str,
    ) -> impl std::future::Future<Output = Option<ScrumDraft>> + Send;
}

/// Whether the text is a scrum-update request.
///
/// Case-insensitive containment over the trimmed text, matching either
/// the "scrum update" phrase or the "regenerate" command.
pub fn is_scrum_command(user_message: &str) -> bool {
    let normalized = user_message.trim().to_lowercase();
    normalized.contains("scrum update") || normalized.contains("regenerate")
}

/// Monotonic generation counter shared between generator instances.
///
/// Injected at construction rather than living in process-global state so
/// tests control and reset it by building a fresh one. Clones share the
/// same underlying counter.
#[derive(Clone, Debug, Default)]
pub struct GenerationSequence(Arc<AtomicU64>);

impl GenerationSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically advance and return the next 1-based sequence value.
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Command-classifier strategy with a fixed three-entry rotation.
///
/// Consecutive generations are guaranteed distinct: the sequence value is
/// appended to every field as a `(v{n})` suffix.
pub struct CannedScrumGenerator {
    sequence: GenerationSequence,
}

/// The canned rotation, indexed by `(sequence - 1) % 3`.
const VARIANTS: [(&str, &str, &str); 3] = [
    (
        "Finished initial multi-session persistence.",
        "Wire scrum-session generation by date.",
        "No blocker.",
    ),
    (
        "Completed scrum session tagging and validation fixes.",
        "Polish regenerate flow and add tests.",
        "Waiting on one PR review.",
    ),
    (
        "Refined chat persistence for repeated updates.",
        "Clean up prompts and session UX.",
        "Need product confirmation on wording.",
    ),
];

impl CannedScrumGenerator {
    pub fn new(sequence: GenerationSequence) -> Self {
        Self { sequence }
    }

    /// Generate a draft unconditionally (classification already done).
    pub fn generate(&self) -> ScrumDraft {
        let sequence = self.sequence.next();
        let generated_at = Utc::now();
        let (yesterday, today, blocker) = VARIANTS[((sequence - 1) % VARIANTS.len() as u64) as usize];

        ScrumDraft {
            scrum_date: generated_at.date_naive(),
            generated_at,
            yesterday: format!("{yesterday} (v{sequence})"),
            today: format!("{today} (v{sequence})"),
            blocker: format!("{blocker} (v{sequence})"),
        }
    }
}

impl ScrumUpdateGenerator for CannedScrumGenerator {
    async fn draft_for_message(&self, _user_id: &str, user_message: &str) -> Option<ScrumDraft> {
        if !is_scrum_command(user_message) {
            debug!("Message is not a scrum command");
            return None;
        }
        Some(self.generate())
    }
}

/// Activity-feed-backed strategy.
///
/// Classification is the same as the canned variant; the draft body comes
/// from the caller's feed activity in the yesterday/today window. Feed
/// unavailability of any kind degrades to "no draft".
pub struct FeedScrumGenerator<F: ActivityFeed> {
    feed: F,
}

impl<F: ActivityFeed> FeedScrumGenerator<F> {
    pub fn new(feed: F) -> Self {
        Self { feed }
    }

    fn build_yesterday_items(context: &ActivityContext) -> Vec<String> {
        let window = &context.window;
        let mut items = Vec::new();

        for log in context
            .time_logs
            .iter()
            .filter(|log| log.started_at.date_naive() == window.yesterday)
        {
            let mut entry = format!("{}: logged {}", log.item_key, format_duration(log.seconds_spent));
            if !log.comment.trim().is_empty() {
                entry.push_str(&format!(" ({})", trim_to(&log.comment, ITEM_TEXT_LIMIT)));
            }
            items.push(entry);
        }

        for comment in context
            .comments
            .iter()
            .filter(|comment| comment.created_at.date_naive() == window.yesterday)
        {
            items.push(format!(
                "{}: commented '{}'",
                comment.item_key,
                trim_to(&comment.body, ITEM_TEXT_LIMIT)
            ));
        }

        for change in context
            .field_changes
            .iter()
            .filter(|change| change.changed_at.date_naive() == window.yesterday)
        {
            items.push(format!(
                "{}: updated {} from '{}' to '{}'",
                change.item_key, change.field, change.from_value, change.to_value
            ));
        }

        items.truncate(MAX_ITEMS_PER_FIELD);
        items
    }

    fn build_today_items(context: &ActivityContext) -> Vec<String> {
        let window = &context.window;
        let mut items = Vec::new();

        for item in &context.active_items {
            items.push(format!("{}: continue {} ({})", item.key, item.summary, item.status));
        }

        for change in context
            .field_changes
            .iter()
            .filter(|change| change.changed_at.date_naive() == window.today)
        {
            items.push(format!("{}: follow up on {} changes", change.item_key, change.field));
        }

        items.truncate(MAX_ITEMS_PER_FIELD);
        items
    }
}

impl<F: ActivityFeed> ScrumUpdateGenerator for FeedScrumGenerator<F> {
    async fn draft_for_message(&self, user_id: &str, user_message: &str) -> Option<ScrumDraft> {
        if !is_scrum_command(user_message) {
            return None;
        }

        let window = ActivityWindow::around(Utc::now());
        let context = match self.feed.fetch_context(user_id, &window).await {
            Ok(context) => context,
            Err(err) => {
                warn!(%err, "Activity feed unavailable, producing no draft");
                return None;
            }
        };

        let yesterday_items = Self::build_yesterday_items(&context);
        let today_items = Self::build_today_items(&context);

        Some(ScrumDraft {
            scrum_date: context.window.today,
            generated_at: context.generated_at,
            yesterday: if yesterday_items.is_empty() {
                NO_ACTIVITY_YESTERDAY.to_string()
            } else {
                yesterday_items.join("; ")
            },
            today: if today_items.is_empty() {
                CONTINUE_ACTIVE_WORK.to_string()
            } else {
                today_items.join("; ")
            },
            blocker: NO_BLOCKER.to_string(),
        })
    }
}

/// "1h 30m" style rendering of logged seconds.
fn format_duration(seconds: i64) -> String {
    if seconds <= 0 {
        return "0m".to_string();
    }
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    match (hours, minutes) {
        (0, m) => format!("{m}m"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h {m}m"),
    }
}

/// Newline-stripped, trimmed, cut to `limit` characters.
fn trim_to(text: &str, limit: usize) -> String {
    let flattened: String = text
        .trim()
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    flattened.chars().take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use standup_types::error::FeedError;
    use standup_types::feed::{ActiveItem, CommentEntry, FieldChangeEntry, TimeLogEntry};

    #[test]
    fn test_is_scrum_command() {
        assert!(is_scrum_command("scrum update"));
        assert!(is_scrum_command("  Please give me my SCRUM UPDATE  "));
        assert!(is_scrum_command("regenerate"));
        assert!(is_scrum_command("could you regenerate that?"));
        assert!(!is_scrum_command("hey"));
        assert!(!is_scrum_command("what did I do yesterday?"));
        assert!(!is_scrum_command(""));
    }

    #[test]
    fn test_sequence_is_shared_across_clones() {
        let sequence = GenerationSequence::new();
        let other = sequence.clone();
        assert_eq!(sequence.next(), 1);
        assert_eq!(other.next(), 2);
        assert_eq!(sequence.next(), 3);
    }

    #[tokio::test]
    async fn test_canned_generator_ignores_small_talk() {
        let generator = CannedScrumGenerator::new(GenerationSequence::new());
        assert!(generator.draft_for_message("u1", "hey").await.is_none());
    }

    #[tokio::test]
    async fn test_canned_generator_rotates_and_suffixes() {
        let generator = CannedScrumGenerator::new(GenerationSequence::new());

        let first = generator.draft_for_message("u1", "scrum update").await.unwrap();
        let second = generator.draft_for_message("u1", "regenerate").await.unwrap();

        assert!(first.yesterday.ends_with("(v1)"));
        assert!(second.yesterday.ends_with("(v2)"));
        assert_ne!(first.yesterday, second.yesterday);
        assert_ne!(first.today, second.today);
        assert_ne!(first.blocker, second.blocker);

        // Fourth generation wraps back to the first variant body.
        let third = generator.draft_for_message("u1", "regenerate").await.unwrap();
        let fourth = generator.draft_for_message("u1", "regenerate").await.unwrap();
        assert!(fourth.yesterday.starts_with(VARIANTS[0].0));
        assert_ne!(third.yesterday, fourth.yesterday);
    }

    struct FakeFeed {
        result: Result<ActivityContext, FeedError>,
    }

    impl ActivityFeed for FakeFeed {
        async fn fetch_context(
            &self,
            _user_id: &str,
            _window: &ActivityWindow,
        ) -> Result<ActivityContext, FeedError> {
            match &self.result {
                Ok(context) => Ok(context.clone()),
                Err(FeedError::NotConnected) => Err(FeedError::NotConnected),
                Err(FeedError::Timeout) => Err(FeedError::Timeout),
                Err(FeedError::Upstream(msg)) => Err(FeedError::Upstream(msg.clone())),
            }
        }
    }

    fn yesterday_at(window: &ActivityWindow, hour: u32) -> DateTime<Utc> {
        window
            .yesterday
            .and_hms_opt(hour, 0, 0)
            .unwrap()
            .and_utc()
    }

    fn populated_context() -> ActivityContext {
        let now = Utc::now();
        let window = ActivityWindow::around(now);
        ActivityContext {
            generated_at: now,
            window,
            active_items: vec![ActiveItem {
                key: "PROJ-1".to_string(),
                summary: "Session store".to_string(),
                status: "In Progress".to_string(),
                updated_at: now,
                project: "PROJ".to_string(),
            }],
            time_logs: vec![TimeLogEntry {
                item_key: "PROJ-1".to_string(),
                item_summary: "Session store".to_string(),
                author_id: "u1".to_string(),
                started_at: yesterday_at(&window, 10),
                seconds_spent: 5400,
                comment: "repository\nrefactor".to_string(),
            }],
            comments: vec![CommentEntry {
                item_key: "PROJ-2".to_string(),
                item_summary: "Draft generator".to_string(),
                author_id: "u1".to_string(),
                created_at: yesterday_at(&window, 11),
                body: "looks good".to_string(),
            }],
            field_changes: vec![
                FieldChangeEntry {
                    item_key: "PROJ-3".to_string(),
                    item_summary: "Parser".to_string(),
                    author_id: "u1".to_string(),
                    changed_at: yesterday_at(&window, 12),
                    field: "status".to_string(),
                    from_value: "To Do".to_string(),
                    to_value: "In Progress".to_string(),
                },
                FieldChangeEntry {
                    item_key: "PROJ-3".to_string(),
                    item_summary: "Parser".to_string(),
                    author_id: "u1".to_string(),
                    changed_at: now,
                    field: "assignee".to_string(),
                    from_value: "nobody".to_string(),
                    to_value: "u1".to_string(),
                },
            ],
        }
    }

    #[tokio::test]
    async fn test_feed_generator_composes_fields() {
        let generator = FeedScrumGenerator::new(FakeFeed {
            result: Ok(populated_context()),
        });

        let draft = generator.draft_for_message("u1", "scrum update").await.unwrap();

        assert_eq!(
            draft.yesterday,
            "PROJ-1: logged 1h 30m (repository refactor); \
             PROJ-2: commented 'looks good'; \
             PROJ-3: updated status from 'To Do' to 'In Progress'"
        );
        assert!(draft.today.starts_with("PROJ-1: continue Session store (In Progress)"));
        assert!(draft.today.contains("PROJ-3: follow up on assignee changes"));
        assert_eq!(draft.blocker, NO_BLOCKER);
    }

    #[tokio::test]
    async fn test_feed_generator_defaults_when_feed_is_empty() {
        let now = Utc::now();
        let generator = FeedScrumGenerator::new(FakeFeed {
            result: Ok(ActivityContext::empty(now, ActivityWindow::around(now))),
        });

        let draft = generator.draft_for_message("u1", "scrum update").await.unwrap();
        assert_eq!(draft.yesterday, NO_ACTIVITY_YESTERDAY);
        assert_eq!(draft.today, CONTINUE_ACTIVE_WORK);
        assert_eq!(draft.blocker, NO_BLOCKER);
    }

    #[tokio::test]
    async fn test_feed_generator_caps_items_per_field() {
        let now = Utc::now();
        let window = ActivityWindow::around(now);
        let mut context = ActivityContext::empty(now, window);
        for n in 0..20 {
            context.comments.push(CommentEntry {
                item_key: format!("PROJ-{n}"),
                item_summary: "item".to_string(),
                author_id: "u1".to_string(),
                created_at: yesterday_at(&window, 9),
                body: format!("comment {n}"),
            });
        }

        let generator = FeedScrumGenerator::new(FakeFeed { result: Ok(context) });
        let draft = generator.draft_for_message("u1", "scrum update").await.unwrap();
        assert_eq!(draft.yesterday.matches("; ").count(), MAX_ITEMS_PER_FIELD - 1);
    }

    #[tokio::test]
    async fn test_feed_failure_produces_no_draft() {
        for err in [
            FeedError::NotConnected,
            FeedError::Timeout,
            FeedError::Upstream("503".to_string()),
        ] {
            let generator = FeedScrumGenerator::new(FakeFeed { result: Err(err) });
            assert!(generator.draft_for_message("u1", "scrum update").await.is_none());
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0m");
        assert_eq!(format_duration(-5), "0m");
        assert_eq!(format_duration(1800), "30m");
        assert_eq!(format_duration(3600), "1h");
        assert_eq!(format_duration(5400), "1h 30m");
    }

    #[test]
    fn test_trim_to_strips_newlines_and_truncates() {
        assert_eq!(trim_to("  a\nb\rc  ", 80), "a b c");
        let long = "x".repeat(200);
        assert_eq!(trim_to(&long, 80).chars().count(), 80);
    }
}
