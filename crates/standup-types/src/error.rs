use thiserror::Error;

/// Errors from repository operations (used by trait definitions in standup-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors from resolving the caller's tenant identity.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// No durable external-account linkage exists for the caller.
    #[error("external account connection is required")]
    NotConnected,

    #[error("identity resolution failed: {0}")]
    Resolution(String),
}

/// Errors from the external activity feed.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("no linked external account for this caller")]
    NotConnected,

    #[error("activity feed request timed out")]
    Timeout,

    #[error("activity feed error: {0}")]
    Upstream(String),
}

/// Errors from the chat capability.
#[derive(Debug, Error)]
pub enum ChatClientError {
    #[error("chat provider error: {0}")]
    Provider(String),

    #[error("chat stream error: {0}")]
    Stream(String),
}
