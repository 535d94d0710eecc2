//! Jira-backed activity feed.
//!
//! `client` talks to the Jira Cloud search API through the stored OAuth
//! token; `types` holds the wire shapes and the mapping into the
//! provider-agnostic `ActivityContext`.

pub mod client;
pub mod types;
