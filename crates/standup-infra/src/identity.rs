//! Durable-linkage identity resolver.
//!
//! Maps an anonymous local browser/CLI id to the externally authenticated
//! account id through the stored feed token record. One resolver instance
//! exists per request; the result is cached so the id is never
//! re-resolved mid-request.

use tokio::sync::OnceCell;

use standup_core::identity::IdentityResolver;
use standup_types::error::IdentityError;

use crate::sqlite::pool::DatabasePool;
use crate::sqlite::token::SqliteFeedTokenStore;

/// Resolves the tenant id from the feed token linkage.
pub struct LinkedIdentityResolver {
    tokens: SqliteFeedTokenStore,
    local_user_id: String,
    cached: OnceCell<String>,
}

impl LinkedIdentityResolver {
    pub fn new(pool: DatabasePool, local_user_id: impl Into<String>) -> Self {
        Self {
            tokens: SqliteFeedTokenStore::new(pool),
            local_user_id: local_user_id.into(),
            cached: OnceCell::new(),
        }
    }
}

impl IdentityResolver for LinkedIdentityResolver {
    async fn resolve_user_id(&self) -> Result<String, IdentityError> {
        let resolved = self
            .cached
            .get_or_try_init(|| async {
                if self.local_user_id.trim().is_empty() {
                    return Err(IdentityError::NotConnected);
                }

                let token = self
                    .tokens
                    .find_by_local_user(&self.local_user_id)
                    .await
                    .map_err(|e| IdentityError::Resolution(e.to_string()))?
                    .ok_or(IdentityError::NotConnected)?;

                if token.authenticated_user_id.trim().is_empty() {
                    return Err(IdentityError::NotConnected);
                }
                Ok(token.authenticated_user_id)
            })
            .await?;

        Ok(resolved.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::token::FeedTokenUpsert;
    use chrono::{Duration, Utc};

    async fn test_pool() -> DatabasePool {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        std::mem::forget(dir);
        DatabasePool::new(&url).await.unwrap()
    }

    async fn link(pool: &DatabasePool, local: &str, account: &str) {
        SqliteFeedTokenStore::new(pool.clone())
            .upsert_token(&FeedTokenUpsert {
                local_user_id: local.to_string(),
                authenticated_user_id: account.to_string(),
                access_token: "at".to_string(),
                refresh_token: "rt".to_string(),
                expires_at: Utc::now() + Duration::hours(1),
                scope: "read".to_string(),
                cloud_id: None,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_resolves_linked_account() {
        let pool = test_pool().await;
        link(&pool, "browser-1", "acct-42").await;

        let resolver = LinkedIdentityResolver::new(pool, "browser-1");
        assert_eq!(resolver.resolve_user_id().await.unwrap(), "acct-42");
    }

    #[tokio::test]
    async fn test_unlinked_caller_is_not_connected() {
        let pool = test_pool().await;
        let resolver = LinkedIdentityResolver::new(pool, "browser-unknown");
        assert!(matches!(
            resolver.resolve_user_id().await,
            Err(IdentityError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_blank_local_id_is_not_connected() {
        let pool = test_pool().await;
        let resolver = LinkedIdentityResolver::new(pool, "  ");
        assert!(matches!(
            resolver.resolve_user_id().await,
            Err(IdentityError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_resolution_is_cached_for_the_request_scope() {
        let pool = test_pool().await;
        link(&pool, "browser-1", "acct-42").await;

        let resolver = LinkedIdentityResolver::new(pool.clone(), "browser-1");
        assert_eq!(resolver.resolve_user_id().await.unwrap(), "acct-42");

        // Unlink; the cached resolution must keep answering within this scope.
        SqliteFeedTokenStore::new(pool)
            .delete_by_local_user("browser-1")
            .await
            .unwrap();
        assert_eq!(resolver.resolve_user_id().await.unwrap(), "acct-42");
    }
}
