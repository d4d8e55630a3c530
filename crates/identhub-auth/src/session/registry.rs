//! Session row lifecycle on the token path.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use identhub_core::config::SessionConfig;
use identhub_core::context::RequestContext;
use identhub_core::events::SecurityEvent;
use identhub_core::traits::AuditSink;
use identhub_core::AppResult;
use identhub_database::stores::SessionStore;
use identhub_entity::session::Session;

use super::fingerprint::ClientFingerprint;

/// Records and validates the one-session-per-login rows backing the
/// "your devices" view.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<dyn SessionStore>,
    audit: Arc<dyn AuditSink>,
    config: SessionConfig,
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("config", &self.config)
            .finish()
    }
}

impl SessionRegistry {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        audit: Arc<dyn AuditSink>,
        config: SessionConfig,
    ) -> Self {
        Self {
            sessions,
            audit,
            config,
        }
    }

    /// Creates a session row for a fresh login, fingerprinting the client
    /// from the context's user agent.
    pub async fn create_session(
        &self,
        ctx: &RequestContext,
        user_id: Uuid,
        refresh_token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<Session> {
        let tenant_id = ctx.require_tenant()?.to_string();
        let fingerprint = ClientFingerprint::parse(ctx.user_agent.as_deref());

        let session = Session {
            id: Uuid::new_v4(),
            user_id,
            tenant_id: tenant_id.clone(),
            refresh_token_hash: refresh_token_hash.to_string(),
            ip_address: ctx.ip_address.clone(),
            user_agent: ctx.user_agent.clone(),
            device_type: fingerprint.device_type,
            browser: fingerprint.browser,
            operating_system: fingerprint.operating_system,
            revoked: false,
            revoked_at: None,
            revoked_by: None,
            revoked_reason: None,
            revoked_tenant_id: None,
            created_at: ctx.request_time,
            last_activity_at: ctx.request_time,
            expires_at,
        };

        let stored = self.sessions.insert(&session).await?;

        if let Err(e) = self
            .audit
            .security_event(&SecurityEvent::SessionCreated {
                session_id: stored.id,
                user_id,
                tenant_id: tenant_id.clone(),
                ip_address: stored.ip_address.clone(),
            })
            .await
        {
            warn!(error = %e, "Failed to write session-created audit event");
        }

        info!(
            session_id = %stored.id,
            user_id = %user_id,
            tenant_id = %tenant_id,
            device = %stored.device_type,
            "Session created"
        );

        Ok(stored)
    }

    /// Checks whether the session bound to a refresh-token hash still
    /// permits a refresh.
    ///
    /// A hash with no session row is decided by configuration: legacy
    /// deployments treat untracked tokens as valid, fresh deployments
    /// reject them.
    pub async fn validate_session(
        &self,
        ctx: &RequestContext,
        refresh_token_hash: &str,
    ) -> AppResult<bool> {
        let tenant_id = ctx.require_tenant()?;

        match self
            .sessions
            .find_by_refresh_token_hash(tenant_id, refresh_token_hash)
            .await?
        {
            Some(session) => Ok(session.is_active(ctx.request_time)),
            None => Ok(self.config.allow_untracked_refresh_tokens),
        }
    }

    /// Best-effort activity ping on the session bound to a refresh-token
    /// hash. A missing row is not an error.
    pub async fn touch(&self, ctx: &RequestContext, refresh_token_hash: &str) -> AppResult<()> {
        let tenant_id = ctx.require_tenant()?;

        let touched = self
            .sessions
            .touch_by_refresh_token_hash(tenant_id, refresh_token_hash)
            .await?;
        if !touched {
            debug!(tenant_id = %tenant_id, "No tracked session for activity ping");
        }
        Ok(())
    }
}
