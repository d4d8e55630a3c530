//! Session listing and revocation with the self/admin authorization split.
//!
//! Self-service methods enforce that the caller acts on their own
//! sessions; the `_admin` variants skip that check and trust the inbound
//! surface to have gated access. Revocations are idempotent: revoking a
//! missing or already-revoked session returns `false` without an error
//! and without a second audit event.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use identhub_core::context::RequestContext;
use identhub_core::error::AppError;
use identhub_core::events::{PolicyCode, RevocationReason, SecurityEvent};
use identhub_core::traits::AuditSink;
use identhub_core::AppResult;
use identhub_database::stores::SessionStore;
use identhub_entity::session::{Session, SessionWithUser};

/// The session-management surface.
#[derive(Clone)]
pub struct SessionService {
    sessions: Arc<dyn SessionStore>,
    audit: Arc<dyn AuditSink>,
}

impl std::fmt::Debug for SessionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionService").finish()
    }
}

impl SessionService {
    pub fn new(sessions: Arc<dyn SessionStore>, audit: Arc<dyn AuditSink>) -> Self {
        Self { sessions, audit }
    }

    /// Lists a user's live sessions. The caller may only list their own.
    pub async fn get_user_sessions(
        &self,
        ctx: &RequestContext,
        user_id: Uuid,
    ) -> AppResult<Vec<Session>> {
        let tenant_id = ctx.require_tenant()?;
        let caller = ctx.require_caller()?;

        if caller != user_id {
            self.cross_user_denied(caller, user_id).await;
            return Err(AppError::unauthorized("you can only view your own sessions"));
        }

        self.sessions.find_active_by_user(tenant_id, user_id).await
    }

    /// Lists a user's live sessions with the owner's identity fields.
    pub async fn get_user_sessions_admin(
        &self,
        ctx: &RequestContext,
        user_id: Uuid,
    ) -> AppResult<Vec<SessionWithUser>> {
        let tenant_id = ctx.require_tenant()?;
        self.sessions
            .find_active_by_user_with_identity(tenant_id, user_id)
            .await
    }

    /// Fetches a single session by id.
    pub async fn get_session_admin(
        &self,
        ctx: &RequestContext,
        session_id: Uuid,
    ) -> AppResult<Session> {
        let tenant_id = ctx.require_tenant()?;
        self.sessions
            .find_by_id(tenant_id, session_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Session {session_id} not found")))
    }

    /// Revokes one of the caller's own sessions.
    ///
    /// Returns `false` when the session is missing or already revoked.
    pub async fn revoke_session(
        &self,
        ctx: &RequestContext,
        session_id: Uuid,
        reason: &str,
    ) -> AppResult<bool> {
        let tenant_id = ctx.require_tenant()?.to_string();
        let caller = ctx.require_caller()?;

        let Some(session) = self.sessions.find_by_id(&tenant_id, session_id).await? else {
            return Ok(false);
        };

        if session.user_id != caller {
            self.cross_user_denied(caller, session.user_id).await;
            return Err(AppError::unauthorized("you can only revoke your own sessions"));
        }

        self.revoke_and_audit(&tenant_id, &session, caller, reason, RevocationReason::UserLogout)
            .await
    }

    /// Revokes any session in the tenant.
    pub async fn revoke_session_admin(
        &self,
        ctx: &RequestContext,
        session_id: Uuid,
        reason: &str,
    ) -> AppResult<bool> {
        let tenant_id = ctx.require_tenant()?.to_string();
        let caller = ctx.require_caller()?;

        let Some(session) = self.sessions.find_by_id(&tenant_id, session_id).await? else {
            return Ok(false);
        };

        self.revoke_and_audit(&tenant_id, &session, caller, reason, RevocationReason::AdminRevoked)
            .await
    }

    /// Revokes all of the caller's own live sessions, optionally keeping
    /// the current one. Returns the number revoked.
    pub async fn revoke_all_sessions(
        &self,
        ctx: &RequestContext,
        user_id: Uuid,
        except_session_id: Option<Uuid>,
        reason: &str,
    ) -> AppResult<u64> {
        let tenant_id = ctx.require_tenant()?.to_string();
        let caller = ctx.require_caller()?;

        if caller != user_id {
            self.cross_user_denied(caller, user_id).await;
            return Err(AppError::unauthorized("you can only revoke your own sessions"));
        }

        self.revoke_all_and_audit(
            &tenant_id,
            user_id,
            caller,
            except_session_id,
            reason,
            RevocationReason::UserLogout,
        )
        .await
    }

    /// Revokes all live sessions of any user in the tenant.
    pub async fn revoke_all_sessions_admin(
        &self,
        ctx: &RequestContext,
        user_id: Uuid,
        except_session_id: Option<Uuid>,
        reason: &str,
    ) -> AppResult<u64> {
        let tenant_id = ctx.require_tenant()?.to_string();
        let caller = ctx.require_caller()?;

        self.revoke_all_and_audit(
            &tenant_id,
            user_id,
            caller,
            except_session_id,
            reason,
            RevocationReason::AdminRevoked,
        )
        .await
    }

    async fn revoke_and_audit(
        &self,
        tenant_id: &str,
        session: &Session,
        revoked_by: Uuid,
        reason: &str,
        audit_reason: RevocationReason,
    ) -> AppResult<bool> {
        let revoked = self
            .sessions
            .revoke(tenant_id, session.id, revoked_by, reason, tenant_id)
            .await?;

        if revoked {
            self.audit_event(&SecurityEvent::SessionRevoked {
                session_id: session.id,
                user_id: session.user_id,
                revoked_by,
                reason: audit_reason,
            })
            .await;
            info!(
                session_id = %session.id,
                user_id = %session.user_id,
                revoked_by = %revoked_by,
                "Session revoked"
            );
        }

        Ok(revoked)
    }

    async fn revoke_all_and_audit(
        &self,
        tenant_id: &str,
        user_id: Uuid,
        revoked_by: Uuid,
        except: Option<Uuid>,
        reason: &str,
        audit_reason: RevocationReason,
    ) -> AppResult<u64> {
        let count = self
            .sessions
            .revoke_all_for_user(tenant_id, user_id, revoked_by, except, reason, tenant_id)
            .await?;

        if count > 0 {
            self.audit_event(&SecurityEvent::SessionsRevoked {
                user_id,
                revoked_by,
                count,
                reason: audit_reason,
            })
            .await;
            info!(user_id = %user_id, count, revoked_by = %revoked_by, "Sessions revoked");
        }

        Ok(count)
    }

    async fn cross_user_denied(&self, caller: Uuid, target: Uuid) {
        self.audit_event(&SecurityEvent::PolicyFailed {
            actor_id: Some(caller),
            target_id: Some(target),
            code: PolicyCode::CrossUserSessionAccess,
        })
        .await;
    }

    async fn audit_event(&self, event: &SecurityEvent) {
        if let Err(e) = self.audit.security_event(event).await {
            warn!(error = %e, "Failed to write security audit event");
        }
    }
}
