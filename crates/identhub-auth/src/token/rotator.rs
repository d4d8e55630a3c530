//! Single-use refresh-token rotation.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use identhub_core::context::RequestContext;
use identhub_core::error::AppError;
use identhub_core::events::{RevocationReason, SecurityEvent};
use identhub_core::traits::AuditSink;
use identhub_core::AppResult;
use identhub_database::stores::SessionStore;
use identhub_entity::token::TokenPair;

use crate::credentials::CredentialValidator;
use crate::session::SessionRegistry;

use super::hash_refresh_token;
use super::issuer::TokenIssuer;
use super::signer::TokenSigner;

/// Rotates refresh tokens: every successful refresh invalidates the token
/// that was used, so a stolen refresh token stops working the moment its
/// legitimate owner (or the thief) uses it once.
#[derive(Clone)]
pub struct TokenRotator {
    validator: Arc<CredentialValidator>,
    issuer: Arc<TokenIssuer>,
    registry: Arc<SessionRegistry>,
    sessions: Arc<dyn SessionStore>,
    signer: Arc<dyn TokenSigner>,
    audit: Arc<dyn AuditSink>,
}

impl std::fmt::Debug for TokenRotator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRotator").finish()
    }
}

impl TokenRotator {
    pub fn new(
        validator: Arc<CredentialValidator>,
        issuer: Arc<TokenIssuer>,
        registry: Arc<SessionRegistry>,
        sessions: Arc<dyn SessionStore>,
        signer: Arc<dyn TokenSigner>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            validator,
            issuer,
            registry,
            sessions,
            signer,
            audit,
        }
    }

    /// Exchanges an old access/refresh pair for a new one:
    ///
    /// 1. Validate the refresh token (user lookup by hash, status, tenant)
    /// 2. Validate the bound session is not revoked or expired
    /// 3. Check the old access token's subject matches the refresh token's user
    /// 4. Issue a new pair
    /// 5. Overwrite the stored refresh-token hash and rebind the session,
    ///    both in one transaction
    /// 6. Audit the retirement of the old token and the new issuance
    ///
    /// The old refresh token is unusable from step 5 on. Two concurrent
    /// calls with the same token race on that overwrite; the loser fails
    /// step 1 on its next attempt, which is the intended outcome.
    pub async fn refresh(
        &self,
        ctx: &RequestContext,
        old_access_token: &str,
        old_refresh_token: &str,
    ) -> AppResult<TokenPair> {
        // Step 1: Validate the refresh token
        let (user_id, claims) = match self
            .validator
            .validate_refresh_token(ctx, old_refresh_token)
            .await
        {
            Ok(validated) => validated,
            Err(e) => {
                self.audit_revoked(None, ctx.tenant_id.clone(), RevocationReason::InvalidRefreshToken)
                    .await;
                return Err(e);
            }
        };

        // Step 2: Validate the bound session
        let old_hash = hash_refresh_token(old_refresh_token);
        if !self.registry.validate_session(ctx, &old_hash).await? {
            self.audit_revoked(
                Some(user_id),
                Some(claims.tenant.clone()),
                RevocationReason::SessionRevoked,
            )
            .await;
            return Err(AppError::unauthorized("refresh token is invalid or expired"));
        }

        // Step 3: Subject check. The access token may be expired, but its
        // subject must belong to the same user as the refresh token.
        match self.signer.peek_subject(old_access_token) {
            Ok(subject) if subject == user_id => {}
            _ => {
                self.audit_revoked(
                    Some(user_id),
                    Some(claims.tenant.clone()),
                    RevocationReason::SubjectMismatch,
                )
                .await;
                return Err(AppError::unauthorized("Access token subject mismatch."));
            }
        }

        // Step 4: Issue the new pair
        let pair = self.issuer.issue(&claims)?;

        // Step 5: Retire the old hash and rebind the session atomically
        let new_hash = hash_refresh_token(&pair.refresh_token);
        self.sessions
            .rotate_refresh_binding(user_id, &old_hash, &new_hash, pair.refresh_expires_at)
            .await?;

        // Step 6: Audit old-out, new-in
        self.audit_revoked(
            Some(user_id),
            Some(claims.tenant.clone()),
            RevocationReason::RefreshTokenRotated,
        )
        .await;
        self.audit_event(&SecurityEvent::TokenIssued {
            user_id,
            tenant_id: claims.tenant.clone(),
            jti: claims.jti,
        })
        .await;

        info!(user_id = %user_id, tenant_id = %claims.tenant, "Refresh token rotated");

        Ok(pair)
    }

    async fn audit_revoked(
        &self,
        user_id: Option<Uuid>,
        tenant_id: Option<String>,
        reason: RevocationReason,
    ) {
        self.audit_event(&SecurityEvent::TokenRevoked {
            user_id,
            tenant_id,
            reason,
        })
        .await;
    }

    async fn audit_event(&self, event: &SecurityEvent) {
        if let Err(e) = self.audit.security_event(event).await {
            warn!(error = %e, "Failed to write security audit event");
        }
    }
}
