//! Password expiry and reuse-history policy.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use identhub_core::config::PasswordPolicyConfig;
use identhub_core::traits::CredentialHasher;
use identhub_core::AppResult;
use identhub_database::stores::PasswordHistoryStore;
use identhub_entity::password_history::PasswordHistoryEntry;
use identhub_entity::user::User;

/// Where a password sits in its expiry lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PasswordStatus {
    /// Past the expiry window; the user must change it.
    Expired,
    /// Inside the warning window before expiry.
    ExpiringSoon,
    /// Neither expired nor near expiry.
    Valid,
}

/// Password expiry computations and the reuse-history check.
///
/// Expiry methods are pure over `(user, now)` so callers pass the request
/// time from their context.
#[derive(Clone)]
pub struct PasswordPolicy {
    config: PasswordPolicyConfig,
    history: Arc<dyn PasswordHistoryStore>,
    hasher: Arc<dyn CredentialHasher>,
}

impl std::fmt::Debug for PasswordPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordPolicy")
            .field("config", &self.config)
            .finish()
    }
}

impl PasswordPolicy {
    pub fn new(
        config: PasswordPolicyConfig,
        history: Arc<dyn PasswordHistoryStore>,
        hasher: Arc<dyn CredentialHasher>,
    ) -> Self {
        Self {
            config,
            history,
            hasher,
        }
    }

    /// Whether the user's password is past the expiry window.
    ///
    /// Always `false` when expiry enforcement is disabled.
    pub fn is_expired(&self, user: &User, now: DateTime<Utc>) -> bool {
        if !self.config.enforce_expiry {
            return false;
        }
        now > self.expires_at(user)
    }

    /// Whole days until the password expires, truncated toward zero.
    ///
    /// Returns `i64::MAX` when expiry enforcement is disabled, and a
    /// non-positive number once the password has expired.
    pub fn days_until_expiry(&self, user: &User, now: DateTime<Utc>) -> i64 {
        if !self.config.enforce_expiry {
            return i64::MAX;
        }
        (self.expires_at(user) - now).num_days()
    }

    /// Whether the password is inside the warning window before expiry.
    ///
    /// Mutually exclusive with [`Self::is_expired`]: a password that has
    /// already expired is not "expiring soon".
    pub fn is_expiring_soon(&self, user: &User, now: DateTime<Utc>) -> bool {
        if self.is_expired(user, now) {
            return false;
        }
        let days = self.days_until_expiry(user, now);
        (0..=self.config.warning_days as i64).contains(&days)
    }

    /// Derives the lifecycle status; expired takes priority over the
    /// warning window.
    pub fn status(&self, user: &User, now: DateTime<Utc>) -> PasswordStatus {
        if self.is_expired(user, now) {
            PasswordStatus::Expired
        } else if self.is_expiring_soon(user, now) {
            PasswordStatus::ExpiringSoon
        } else {
            PasswordStatus::Valid
        }
    }

    /// Whether the candidate password matches any of the user's most recent
    /// retained password hashes.
    ///
    /// Returns `false` without touching the store when the history feature
    /// is disabled (`history_count == 0`).
    pub async fn is_password_in_history(
        &self,
        user_id: Uuid,
        candidate: &str,
    ) -> AppResult<bool> {
        if self.config.history_count == 0 {
            return Ok(false);
        }

        let entries = self.history.recent(user_id, self.config.history_count).await?;
        for entry in &entries {
            if self.hasher.verify(&entry.password_hash, candidate)?.is_valid() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Appends a hash to the user's history and prunes the excess so at
    /// most `history_count` entries remain.
    pub async fn record_password_change(
        &self,
        user_id: Uuid,
        password_hash: &str,
    ) -> AppResult<()> {
        if self.config.history_count == 0 {
            return Ok(());
        }

        let entry = PasswordHistoryEntry::new(user_id, password_hash);
        self.history.append(&entry).await?;

        let pruned = self.history.prune(user_id, self.config.history_count).await?;
        if pruned > 0 {
            debug!(user_id = %user_id, pruned, "Pruned password history");
        }
        Ok(())
    }

    fn expires_at(&self, user: &User) -> DateTime<Utc> {
        user.password_changed_at + Duration::days(self.config.expiry_days as i64)
    }
}
