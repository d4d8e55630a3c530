//! Purging of long-expired session rows.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::info;

use identhub_core::config::SessionConfig;
use identhub_core::AppResult;
use identhub_database::stores::SessionStore;

/// Deletes session rows that have been expired for longer than the
/// retention window.
///
/// Recently-expired sessions are kept so their revocation history stays
/// inspectable; only rows past `retention_days` are removed.
#[derive(Clone)]
pub struct SessionCleanup {
    sessions: Arc<dyn SessionStore>,
    retention: Duration,
}

impl std::fmt::Debug for SessionCleanup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCleanup")
            .field("retention", &self.retention)
            .finish()
    }
}

impl SessionCleanup {
    pub fn new(sessions: Arc<dyn SessionStore>, config: &SessionConfig) -> Self {
        Self {
            sessions,
            retention: Duration::days(config.retention_days as i64),
        }
    }

    /// Runs one purge pass and returns the number of rows deleted.
    pub async fn purge_once(&self) -> AppResult<u64> {
        let now = Utc::now();
        let cutoff = now - self.retention;

        let purged = self.sessions.purge_expired_before(now, cutoff).await?;
        if purged > 0 {
            info!(purged, "Purged sessions expired past retention");
        }
        Ok(purged)
    }
}
