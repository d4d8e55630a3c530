//! Password hygiene policy configuration.

use serde::{Deserialize, Serialize};

/// Password expiry, history, and strength policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordPolicyConfig {
    /// Whether password expiry is enforced at all.
    #[serde(default = "default_enforce_expiry")]
    pub enforce_expiry: bool,
    /// Number of days a password remains valid after its last change.
    #[serde(default = "default_expiry_days")]
    pub expiry_days: u32,
    /// Days-before-expiry window in which a password counts as expiring soon.
    #[serde(default = "default_warning_days")]
    pub warning_days: u32,
    /// How many previous password hashes are retained and checked against
    /// reuse. `0` disables the history check entirely.
    #[serde(default = "default_history_count")]
    pub history_count: u32,
    /// Minimum password length.
    #[serde(default = "default_min_length")]
    pub min_length: usize,
}

impl Default for PasswordPolicyConfig {
    fn default() -> Self {
        Self {
            enforce_expiry: default_enforce_expiry(),
            expiry_days: default_expiry_days(),
            warning_days: default_warning_days(),
            history_count: default_history_count(),
            min_length: default_min_length(),
        }
    }
}

fn default_enforce_expiry() -> bool {
    false
}

fn default_expiry_days() -> u32 {
    90
}

fn default_warning_days() -> u32 {
    10
}

fn default_history_count() -> u32 {
    5
}

fn default_min_length() -> usize {
    8
}
