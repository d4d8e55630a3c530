//! Audit sink capability trait.

use async_trait::async_trait;
use uuid::Uuid;

use crate::events::SecurityEvent;
use crate::result::AppResult;

/// Trait for the external audit sink.
///
/// IdentHub writes security events and activity entries; it does not own
/// their storage. The default implementation emits structured tracing
/// events, production deployments plug in their audit pipeline.
#[async_trait]
pub trait AuditSink: Send + Sync + 'static {
    /// Record a security event.
    async fn security_event(&self, event: &SecurityEvent) -> AppResult<()>;

    /// Record a non-security activity entry (CRUD, listing, exports).
    async fn activity(
        &self,
        actor_id: Uuid,
        tenant_id: &str,
        action: &str,
        details: serde_json::Value,
    ) -> AppResult<()>;
}
