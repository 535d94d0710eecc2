//! Shared domain types for Standup.
//!
//! This crate contains the core domain types used across the Standup
//! workspace: chat sessions, messages, scrum drafts, activity feed
//! entries, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod chat;
pub mod config;
pub mod error;
pub mod feed;
pub mod scrum;
pub mod session;
