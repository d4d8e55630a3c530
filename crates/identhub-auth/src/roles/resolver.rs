//! Cached resolution of a user's effective role names.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use uuid::Uuid;

use identhub_core::config::CacheConfig;
use identhub_core::error::AppError;
use identhub_core::AppResult;
use identhub_database::stores::RoleStore;

/// Resolves the union of a user's direct and group-inherited roles.
///
/// Resolved lists are cached with a short TTL. Role and group mutations
/// must call [`RoleResolver::invalidate`]; already-issued tokens keep their
/// role claims until the next issuance regardless.
#[derive(Clone)]
pub struct RoleResolver {
    store: Arc<dyn RoleStore>,
    cache: Cache<Uuid, Arc<Vec<String>>>,
}

impl std::fmt::Debug for RoleResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleResolver")
            .field("cached_entries", &self.cache.entry_count())
            .finish()
    }
}

impl RoleResolver {
    pub fn new(store: Arc<dyn RoleStore>, config: &CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.role_cache_capacity)
            .time_to_live(Duration::from_secs(config.role_cache_ttl_seconds))
            .build();

        Self { store, cache }
    }

    /// Returns the user's effective roles, sorted and deduplicated.
    pub async fn resolve(&self, user_id: Uuid) -> AppResult<Vec<String>> {
        let store = Arc::clone(&self.store);
        let roles = self
            .cache
            .try_get_with(user_id, async move {
                let mut union = BTreeSet::new();
                union.extend(store.direct_roles(user_id).await?);
                union.extend(store.group_roles(user_id).await?);
                Ok::<_, AppError>(Arc::new(union.into_iter().collect::<Vec<_>>()))
            })
            .await
            .map_err(|e: Arc<AppError>| (*e).clone())?;

        Ok((*roles).clone())
    }

    /// Drops the cached role list for a user. Call after any role or group
    /// assignment change.
    pub async fn invalidate(&self, user_id: Uuid) {
        self.cache.invalidate(&user_id).await;
    }
}
