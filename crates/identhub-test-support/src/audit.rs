//! An audit sink that records events for assertions.

use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use identhub_core::events::SecurityEvent;
use identhub_core::traits::AuditSink;
use identhub_core::AppResult;

/// One recorded activity entry.
#[derive(Debug, Clone)]
pub struct ActivityEntry {
    pub actor_id: Uuid,
    pub tenant_id: String,
    pub action: String,
    pub details: serde_json::Value,
}

/// Captures everything written to the audit sink so tests can assert on
/// the exact sequence of events.
#[derive(Debug, Default)]
pub struct RecordingAuditSink {
    events: Mutex<Vec<SecurityEvent>>,
    activities: Mutex<Vec<ActivityEntry>>,
}

impl RecordingAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All security events recorded so far, in order.
    pub fn events(&self) -> Vec<SecurityEvent> {
        self.events.lock().expect("audit lock poisoned").clone()
    }

    /// All activity entries recorded so far, in order.
    pub fn activities(&self) -> Vec<ActivityEntry> {
        self.activities.lock().expect("audit lock poisoned").clone()
    }
}

#[async_trait]
impl AuditSink for RecordingAuditSink {
    async fn security_event(&self, event: &SecurityEvent) -> AppResult<()> {
        self.events
            .lock()
            .expect("audit lock poisoned")
            .push(event.clone());
        Ok(())
    }

    async fn activity(
        &self,
        actor_id: Uuid,
        tenant_id: &str,
        action: &str,
        details: serde_json::Value,
    ) -> AppResult<()> {
        self.activities
            .lock()
            .expect("audit lock poisoned")
            .push(ActivityEntry {
                actor_id,
                tenant_id: tenant_id.to_string(),
                action: action.to_string(),
                details,
            });
        Ok(())
    }
}
