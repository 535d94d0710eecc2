//! Observability setup for Standup: tracing subscriber initialization
//! with optional OpenTelemetry span export.

pub mod tracing_setup;
