//! In-process cache configuration.

use serde::{Deserialize, Serialize};

/// Cache settings for the role-list cache.
///
/// Only resolved role lists are cached; token and session state is always
/// read fresh from the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// TTL for cached role lists in seconds.
    #[serde(default = "default_role_ttl")]
    pub role_cache_ttl_seconds: u64,
    /// Maximum number of cached role lists.
    #[serde(default = "default_role_capacity")]
    pub role_cache_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            role_cache_ttl_seconds: default_role_ttl(),
            role_cache_capacity: default_role_capacity(),
        }
    }
}

fn default_role_ttl() -> u64 {
    300
}

fn default_role_capacity() -> u64 {
    10_000
}
