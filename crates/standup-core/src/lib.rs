//! Business logic and repository trait definitions for Standup.
//!
//! This crate defines the "ports" (repository and capability traits) that
//! the infrastructure layer implements. It depends only on
//! `standup-types` -- never on `standup-infra` or any database/IO crate.

pub mod chat;
pub mod feed;
pub mod identity;
pub mod scrum;
pub mod session;
