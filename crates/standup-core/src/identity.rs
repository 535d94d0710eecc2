//! Caller identity resolution.
//!
//! The sole authority for per-request tenant scoping. Everything else
//! treats the resolved id as opaque and trusts it completely; the session
//! store performs no authentication of its own.

use standup_types::error::IdentityError;

/// Resolves the caller's tenant id for the current request scope.
///
/// One resolver instance exists per request; implementations cache the
/// result so the id is not re-resolved mid-request. Fails with
/// [`IdentityError::NotConnected`] when no durable external-identity
/// linkage exists -- that failure is fatal to the request, never
/// swallowed.
pub trait IdentityResolver: Send + Sync {
    fn resolve_user_id(
        &self,
    ) -> impl std::future::Future<Output = Result<String, IdentityError>> + Send;
}

/// Fixed-identity resolver for tests and single-user local runs.
#[derive(Debug, Clone)]
pub struct StaticIdentityResolver {
    user_id: String,
}

impl StaticIdentityResolver {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

impl IdentityResolver for StaticIdentityResolver {
    async fn resolve_user_id(&self) -> Result<String, IdentityError> {
        if self.user_id.trim().is_empty() {
            return Err(IdentityError::Resolution(
                "static identity is blank".to_string(),
            ));
        }
        Ok(self.user_id.clone())
    }
}
