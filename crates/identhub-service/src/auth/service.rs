//! The login flow and its counterparts.
//!
//! Refresh rotation is deliberately not wrapped here: callers use
//! [`identhub_auth::TokenRotator`] directly, since it already owns that
//! flow end to end.

use std::sync::Arc;

use tracing::{debug, info, warn};

use identhub_auth::credentials::CredentialValidator;
use identhub_auth::password::{PasswordPolicy, PasswordStatus};
use identhub_auth::session::SessionRegistry;
use identhub_auth::token::{TokenIssuer, hash_refresh_token};
use identhub_core::context::RequestContext;
use identhub_core::error::AppError;
use identhub_core::events::{PolicyCode, RevocationReason, SecurityEvent};
use identhub_core::traits::AuditSink;
use identhub_core::AppResult;
use identhub_database::stores::{SessionStore, UserStore};
use identhub_entity::session::Session;
use identhub_entity::token::{ClaimSet, TokenPair};

/// Result of a successful login.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LoginOutcome {
    /// Generated token pair.
    pub tokens: TokenPair,
    /// Created device session.
    pub session: Session,
    /// The claim set embedded in the access token.
    pub claims: ClaimSet,
    /// Where the user's password sits in its expiry lifecycle, so the
    /// caller can prompt for a change before it lapses.
    pub password_status: PasswordStatus,
}

/// Composes the credential validator, token issuer, and session registry
/// into the login/logout flows.
#[derive(Clone)]
pub struct AuthService {
    validator: Arc<CredentialValidator>,
    issuer: Arc<TokenIssuer>,
    registry: Arc<SessionRegistry>,
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    password_policy: Arc<PasswordPolicy>,
    audit: Arc<dyn AuditSink>,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService").finish()
    }
}

impl AuthService {
    pub fn new(
        validator: Arc<CredentialValidator>,
        issuer: Arc<TokenIssuer>,
        registry: Arc<SessionRegistry>,
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        password_policy: Arc<PasswordPolicy>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            validator,
            issuer,
            registry,
            users,
            sessions,
            password_policy,
            audit,
        }
    }

    /// Performs the complete login flow:
    ///
    /// 1. Validate credentials (user status, password, tenant lifecycle)
    /// 2. Issue an access/refresh token pair
    /// 3. Persist the refresh-token hash on the user record
    /// 4. Create the device session row
    /// 5. Derive the password's expiry status for the response
    pub async fn login(
        &self,
        ctx: &RequestContext,
        email: &str,
        password: &str,
    ) -> AppResult<LoginOutcome> {
        // Step 1: Validate credentials
        let (user_id, claims) = self.validator.validate_credentials(ctx, email, password).await?;

        // Step 2: Issue the token pair
        let tokens = self.issuer.issue(&claims)?;

        // Step 3: Persist the refresh-token hash
        self.validator
            .store_refresh_token(user_id, &tokens.refresh_token, tokens.refresh_expires_at)
            .await?;

        // Step 4: Create the session row
        let refresh_hash = hash_refresh_token(&tokens.refresh_token);
        let session = self
            .registry
            .create_session(ctx, user_id, &refresh_hash, tokens.refresh_expires_at)
            .await?;

        self.audit_event(&SecurityEvent::TokenIssued {
            user_id,
            tenant_id: claims.tenant.clone(),
            jti: claims.jti,
        })
        .await;

        // Step 5: Derive the password expiry status
        let user = self
            .users
            .find_by_id(&claims.tenant, user_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User {user_id} not found")))?;
        let password_status = self.password_policy.status(&user, ctx.request_time);

        info!(
            user_id = %user_id,
            session_id = %session.id,
            password_status = ?password_status,
            "Login completed"
        );

        Ok(LoginOutcome {
            tokens,
            session,
            claims,
            password_status,
        })
    }

    /// Ends the caller's session identified by its refresh token.
    ///
    /// Returns `false` when no tracked session matches the token, which is
    /// not an error: the token may predate session tracking or already be
    /// purged. Fails `Unauthorized` if the session belongs to another user.
    pub async fn logout(&self, ctx: &RequestContext, refresh_token: &str) -> AppResult<bool> {
        let tenant_id = ctx.require_tenant()?.to_string();
        let caller = ctx.require_caller()?;

        let hash = hash_refresh_token(refresh_token);
        let Some(session) = self.sessions.find_by_refresh_token_hash(&tenant_id, &hash).await?
        else {
            debug!(user_id = %caller, "No tracked session for logout");
            return Ok(false);
        };

        if session.user_id != caller {
            self.audit_event(&SecurityEvent::PolicyFailed {
                actor_id: Some(caller),
                target_id: Some(session.user_id),
                code: PolicyCode::CrossUserSessionAccess,
            })
            .await;
            return Err(AppError::unauthorized("you can only end your own session"));
        }

        let revoked = self
            .sessions
            .revoke(&tenant_id, session.id, caller, "user logout", &tenant_id)
            .await?;

        if revoked {
            self.audit_event(&SecurityEvent::SessionRevoked {
                session_id: session.id,
                user_id: session.user_id,
                revoked_by: caller,
                reason: RevocationReason::UserLogout,
            })
            .await;
            info!(user_id = %caller, session_id = %session.id, "Logout completed");
        }

        Ok(revoked)
    }

    /// Best-effort activity ping for the session behind a refresh token.
    pub async fn record_activity(&self, ctx: &RequestContext, refresh_token: &str) -> AppResult<()> {
        let hash = hash_refresh_token(refresh_token);
        self.registry.touch(ctx, &hash).await
    }

    async fn audit_event(&self, event: &SecurityEvent) {
        if let Err(e) = self.audit.security_event(event).await {
            warn!(error = %e, "Failed to write security audit event");
        }
    }
}
