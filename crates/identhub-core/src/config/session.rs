//! Session tracking and janitor configuration.

use serde::{Deserialize, Serialize};

/// Session registry and cleanup configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Whether a refresh token with no session row is treated as valid.
    ///
    /// Legacy deployments that issued tokens before session tracking
    /// existed need this on; a fresh deployment should keep it off so an
    /// unknown refresh-token hash always fails validation.
    #[serde(default = "default_allow_untracked")]
    pub allow_untracked_refresh_tokens: bool,
    /// Interval between janitor cleanup passes in seconds.
    #[serde(default = "default_janitor_interval")]
    pub janitor_interval_seconds: u64,
    /// Days an expired session is retained before the janitor purges it.
    /// Keeps revocation history inspectable for a window after expiry.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            allow_untracked_refresh_tokens: default_allow_untracked(),
            janitor_interval_seconds: default_janitor_interval(),
            retention_days: default_retention_days(),
        }
    }
}

fn default_allow_untracked() -> bool {
    false
}

fn default_janitor_interval() -> u64 {
    3600
}

fn default_retention_days() -> u32 {
    30
}
