//! JiraActivityFeed -- concrete [`ActivityFeed`] implementation for Jira
//! Cloud.
//!
//! Issues one bounded JQL search per fetch (fields + worklog + comment,
//! changelog expanded) through the stored OAuth token. The access token
//! is wrapped in [`secrecy::SecretString`] and only exposed when building
//! the Authorization header. Token refresh is not attempted here; an
//! expired or missing linkage reports `NotConnected` and the caller's
//! generator degrades to "no draft".

use std::time::Duration;

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use standup_core::feed::ActivityFeed;
use standup_types::error::FeedError;
use standup_types::feed::{ActivityContext, ActivityWindow};

use crate::sqlite::pool::DatabasePool;
use crate::sqlite::token::SqliteFeedTokenStore;

use super::types::{SearchResponse, map_search_response};

/// Issues assigned to the caller that are neither untouched nor done.
const ACTIVE_WORK_JQL: &str =
    "assignee = currentUser() AND statusCategory NOT IN (\"To Do\", \"Done\") ORDER BY updated DESC";

/// Fields the mapping needs; everything else stays off the wire.
const SEARCH_FIELDS: &str = "summary,status,updated,project,worklog,comment";

const MAX_RESULTS: u32 = 50;

/// Jira Cloud activity feed client.
pub struct JiraActivityFeed {
    client: reqwest::Client,
    tokens: SqliteFeedTokenStore,
    base_url: String,
}

impl JiraActivityFeed {
    /// Create a feed client with the given request deadline.
    pub fn new(pool: DatabasePool, base_url: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to create reqwest client");

        Self {
            client,
            tokens: SqliteFeedTokenStore::new(pool),
            base_url,
        }
    }

    /// Override the base URL (useful for testing or proxies).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn search_url(&self, cloud_id: &str) -> String {
        format!(
            "{}/ex/jira/{}/rest/api/3/search/jql",
            self.base_url, cloud_id
        )
    }
}

impl ActivityFeed for JiraActivityFeed {
    async fn fetch_context(
        &self,
        user_id: &str,
        window: &ActivityWindow,
    ) -> Result<ActivityContext, FeedError> {
        let token = self
            .tokens
            .find_by_account(user_id)
            .await
            .map_err(|e| FeedError::Upstream(e.to_string()))?
            .ok_or(FeedError::NotConnected)?;

        if !token.is_valid_at(Utc::now()) {
            debug!("Stored feed token expired");
            return Err(FeedError::NotConnected);
        }
        let Some(cloud_id) = token.cloud_id.as_deref() else {
            return Err(FeedError::NotConnected);
        };
        let access_token = SecretString::from(token.access_token);

        let max_results = MAX_RESULTS.to_string();
        let response = self
            .client
            .get(self.search_url(cloud_id))
            .bearer_auth(access_token.expose_secret())
            .query(&[
                ("jql", ACTIVE_WORK_JQL),
                ("fields", SEARCH_FIELDS),
                ("expand", "changelog"),
                ("maxResults", max_results.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FeedError::Timeout
                } else {
                    FeedError::Upstream(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "Activity feed search rejected");
            return Err(FeedError::Upstream(format!("search returned {status}")));
        }

        let search: SearchResponse = response
            .json()
            .await
            .map_err(|e| FeedError::Upstream(format!("malformed search response: {e}")))?;

        Ok(map_search_response(search, user_id, *window, Utc::now()))
    }
}
