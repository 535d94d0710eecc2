//! ActivityFeed trait definition.
//!
//! The external collaborator supplying the caller's tracker activity.
//! Implementations live in standup-infra (e.g., `JiraActivityFeed`);
//! tests substitute fakes.

use standup_types::error::FeedError;
use standup_types::feed::{ActivityContext, ActivityWindow};

/// Source of the caller's recent activity within a bounded window.
///
/// Entries in the returned context are already scoped to the given user
/// (the provider filters by author where its wire format requires it).
/// Fails with [`FeedError::NotConnected`] when the caller has no linked
/// external account, [`FeedError::Timeout`] when the deadline passes.
pub trait ActivityFeed: Send + Sync {
    fn fetch_context(
        &self,
        user_id: &str,
        window: &ActivityWindow,
    ) -> impl std::future::Future<Output = Result<ActivityContext, FeedError>> + Send;
}
