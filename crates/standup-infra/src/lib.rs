//! Infrastructure layer for Standup.
//!
//! Contains implementations of the traits defined in `standup-core`:
//! SQLite storage (sessions, messages, scrum updates, feed tokens), the
//! Jira-backed activity feed client, the durable-linkage identity
//! resolver, and the TOML configuration loader.

pub mod config;
pub mod identity;
pub mod jira;
pub mod sqlite;
