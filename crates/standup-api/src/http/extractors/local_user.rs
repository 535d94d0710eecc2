//! Anonymous local user extraction.
//!
//! Clients carry a stable anonymous id in the `X-Local-User` header; the
//! durable external-identity linkage maps it to the tenant id. Cookie
//! transport is deliberately not handled here -- the header is the whole
//! contract with the UI shell.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use standup_core::identity::IdentityResolver;
use standup_infra::identity::LinkedIdentityResolver;

use crate::http::error::AppError;
use crate::state::AppState;

/// The caller's anonymous local id, straight from the header.
pub struct LocalUser(pub String);

impl FromRequestParts<AppState> for LocalUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get("x-local-user")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        match value {
            Some(v) => Ok(LocalUser(v.to_string())),
            None => Err(AppError::Unauthorized(
                "Missing X-Local-User header; the client must send its anonymous user id."
                    .to_string(),
            )),
        }
    }
}

impl LocalUser {
    /// Resolve the tenant id for this request.
    ///
    /// Builds a fresh per-request resolver (resolution is cached inside
    /// it) and surfaces `NotConnected` as 401.
    pub async fn resolve(&self, state: &AppState) -> Result<String, AppError> {
        let resolver = LinkedIdentityResolver::new(state.db_pool.clone(), self.0.clone());
        Ok(resolver.resolve_user_id().await?)
    }
}
