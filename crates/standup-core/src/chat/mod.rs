//! Chat capability and turn orchestration.
//!
//! `client` defines the provider-agnostic chat trait, `dummy` ships the
//! deterministic scrum-aware client, and `orchestrator` drives one
//! conversation turn end to end (generate/classify, respond, detect,
//! persist).

pub mod client;
pub mod dummy;
pub mod orchestrator;
