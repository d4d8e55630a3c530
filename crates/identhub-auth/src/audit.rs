//! Tracing-backed audit sink.

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use identhub_core::events::SecurityEvent;
use identhub_core::traits::AuditSink;
use identhub_core::AppResult;

/// Writes audit records as structured log lines under the
/// `identhub::audit` target.
///
/// Deployments that ship audit records elsewhere substitute their own
/// [`AuditSink`]; this one keeps the trail in the log stream.
#[derive(Debug, Clone, Default)]
pub struct LogAuditSink;

impl LogAuditSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuditSink for LogAuditSink {
    async fn security_event(&self, event: &SecurityEvent) -> AppResult<()> {
        let payload = serde_json::to_string(event)?;
        info!(target: "identhub::audit", event = %payload, "Security event");
        Ok(())
    }

    async fn activity(
        &self,
        actor_id: Uuid,
        tenant_id: &str,
        action: &str,
        details: serde_json::Value,
    ) -> AppResult<()> {
        info!(
            target: "identhub::audit",
            actor_id = %actor_id,
            tenant_id = %tenant_id,
            action = %action,
            details = %details,
            "Activity"
        );
        Ok(())
    }
}
