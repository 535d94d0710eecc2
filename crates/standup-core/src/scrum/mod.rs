//! Scrum update generation.
//!
//! Two interchangeable strategies sit behind the
//! [`generator::ScrumUpdateGenerator`] trait: a deterministic
//! command-classifier with canned rotation, and an activity-feed-backed
//! synthesizer. `format` carries the canonical text block both strategies
//! render to and the legacy parser that recovers drafts from it.

pub mod format;
pub mod generator;
