//! REST API layer: router, handlers, envelope responses, extractors.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod router;
