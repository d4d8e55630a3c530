//! Periodic session purge loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::{info, warn};

use identhub_auth::session::SessionCleanup;
use identhub_core::config::SessionConfig;

/// Runs the session cleanup pass on a fixed interval until shut down.
///
/// A failed pass is logged and swallowed; the next tick retries. No
/// caller waits on the janitor, so its errors never propagate.
#[derive(Debug, Clone)]
pub struct SessionJanitor {
    cleanup: Arc<SessionCleanup>,
    interval: Duration,
}

impl SessionJanitor {
    pub fn new(cleanup: Arc<SessionCleanup>, config: &SessionConfig) -> Self {
        Self {
            cleanup,
            interval: Duration::from_secs(config.janitor_interval_seconds),
        }
    }

    /// Runs until the shutdown signal flips to `true`.
    ///
    /// The first purge pass runs immediately, then one per interval. A
    /// pass that overruns its slot delays the next tick rather than
    /// bursting to catch up.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_seconds = self.interval.as_secs(),
            "Session janitor started"
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Session janitor received shutdown signal");
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.cleanup.purge_once().await {
                        warn!(error = %e, "Session purge failed, retrying next tick");
                    }
                }
            }
        }

        info!("Session janitor stopped");
    }
}
