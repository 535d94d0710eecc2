//! Global configuration shape, deserialized from `config.toml`.

use serde::{Deserialize, Serialize};

/// Top-level configuration loaded from `{data_dir}/config.toml`.
///
/// Every field has a default so a missing or partial file still yields a
/// runnable configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Address the REST API binds to.
    pub bind_addr: String,
    pub chat: ChatConfig,
    pub scrum: ScrumConfig,
    pub feed: FeedConfig,
}

/// Chat capability selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Which client backs the chat capability. Currently only "dummy".
    pub client: String,
}

/// Scrum draft generation strategy selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrumConfig {
    /// "canned" for the deterministic rotation, "feed" for the
    /// activity-feed-backed variant.
    pub generator: String,
}

/// Activity feed client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Base URL of the feed API gateway.
    pub base_url: String,
    /// Hard deadline for one feed fetch, in seconds.
    pub timeout_secs: u64,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            chat: ChatConfig::default(),
            scrum: ScrumConfig::default(),
            feed: FeedConfig::default(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            client: "dummy".to_string(),
        }
    }
}

impl Default for ScrumConfig {
    fn default() -> Self {
        Self {
            generator: "canned".to_string(),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.atlassian.com".to_string(),
            timeout_secs: 10,
        }
    }
}
