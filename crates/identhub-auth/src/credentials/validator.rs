//! Credential validation for the login and refresh paths.
//!
//! Login failures are deliberately coarse-grained: the caller can never
//! tell "no such account" from "wrong password" from the response, only
//! from the audit trail.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use identhub_core::context::RequestContext;
use identhub_core::error::AppError;
use identhub_core::events::{DenialReason, SecurityEvent};
use identhub_core::traits::{AuditSink, CredentialHasher, VerifyOutcome};
use identhub_core::AppResult;
use identhub_database::stores::{TenantDirectory, UserStore};
use identhub_entity::tenant::Tenant;
use identhub_entity::token::ClaimSet;
use identhub_entity::user::User;

use crate::roles::RoleResolver;
use crate::token::hash_refresh_token;

/// The one message every credential failure surfaces on the login path.
const GENERIC_DENIAL: &str = "invalid email or password";

/// Validates login credentials and refresh tokens, producing the claim set
/// for token issuance.
#[derive(Clone)]
pub struct CredentialValidator {
    users: Arc<dyn UserStore>,
    tenants: Arc<dyn TenantDirectory>,
    roles: Arc<RoleResolver>,
    hasher: Arc<dyn CredentialHasher>,
    audit: Arc<dyn AuditSink>,
}

impl std::fmt::Debug for CredentialValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialValidator").finish()
    }
}

impl CredentialValidator {
    pub fn new(
        users: Arc<dyn UserStore>,
        tenants: Arc<dyn TenantDirectory>,
        roles: Arc<RoleResolver>,
        hasher: Arc<dyn CredentialHasher>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            users,
            tenants,
            roles,
            hasher,
            audit,
        }
    }

    /// Validates an email/password pair under the context's tenant.
    ///
    /// On success returns the user ID and a freshly built claim set. Every
    /// denial emits one `LoginDenied` audit event carrying the real reason;
    /// the returned error never does.
    pub async fn validate_credentials(
        &self,
        ctx: &RequestContext,
        email: &str,
        password: &str,
    ) -> AppResult<(Uuid, ClaimSet)> {
        let email = email.trim().to_lowercase();

        let tenant_id = match ctx.require_tenant() {
            Ok(id) => id.to_string(),
            Err(e) => {
                self.audit_denied(None, Some(email), DenialReason::MissingTenant).await;
                return Err(e);
            }
        };

        let user = match self.users.find_by_email(&tenant_id, &email).await? {
            Some(user) => user,
            None => {
                self.audit_denied(
                    Some(tenant_id),
                    Some(email),
                    DenialReason::InvalidCredentials,
                )
                .await;
                return Err(AppError::unauthorized(GENERIC_DENIAL));
            }
        };

        let outcome = self.hasher.verify(&user.password_hash, password)?;
        if !outcome.is_valid() {
            self.audit_denied(
                Some(tenant_id),
                Some(email),
                DenialReason::InvalidCredentials,
            )
            .await;
            return Err(AppError::unauthorized(GENERIC_DENIAL));
        }

        if let Err((reason, e)) = self.check_user_status(&user) {
            self.audit_denied(Some(tenant_id), Some(email), reason).await;
            return Err(e);
        }

        let tenant = self.tenants.lookup(&tenant_id).await?;
        if let Err((reason, e)) = tenant_gate(tenant.as_ref(), ctx.request_time) {
            self.audit_denied(Some(tenant_id), Some(email), reason).await;
            return Err(e);
        }

        // The hash parameters may be stale (cost settings raised since the
        // password was set). Re-hash under current parameters now, while the
        // plaintext is available. password_changed_at stays untouched: the
        // password itself did not change.
        if outcome == VerifyOutcome::ValidNeedsRehash {
            match self.hasher.hash(password) {
                Ok(new_hash) => {
                    if let Err(e) = self.users.update_password_hash(user.id, &new_hash).await {
                        warn!(user_id = %user.id, error = %e, "Failed to store re-hashed password");
                    }
                }
                Err(e) => {
                    warn!(user_id = %user.id, error = %e, "Failed to re-hash password");
                }
            }
        }

        let claims = self.build_claims(&user).await?;

        self.audit_event(&SecurityEvent::LoginSucceeded {
            user_id: user.id,
            tenant_id: tenant_id.clone(),
        })
        .await;

        info!(user_id = %user.id, tenant_id = %tenant_id, "Credentials validated");

        Ok((user.id, claims))
    }

    /// Validates a refresh token by its stored hash.
    ///
    /// Applies the same user-status and tenant checks as a login, but does
    /// not audit: the rotation path owns the audit trail for refreshes.
    pub async fn validate_refresh_token(
        &self,
        ctx: &RequestContext,
        refresh_token: &str,
    ) -> AppResult<(Uuid, ClaimSet)> {
        let tenant_id = ctx.require_tenant()?.to_string();

        let hash = hash_refresh_token(refresh_token);
        let user = self
            .users
            .find_by_refresh_token_hash(&tenant_id, &hash)
            .await?
            .ok_or_else(|| AppError::unauthorized("refresh token is invalid or expired"))?;

        if !user.has_live_refresh_token(ctx.request_time) {
            return Err(AppError::unauthorized("refresh token is invalid or expired"));
        }

        self.check_user_status(&user).map_err(|(_, e)| e)?;

        let tenant = self.tenants.lookup(&tenant_id).await?;
        tenant_gate(tenant.as_ref(), ctx.request_time).map_err(|(_, e)| e)?;

        let claims = self.build_claims(&user).await?;
        Ok((user.id, claims))
    }

    /// Hashes and persists a refresh token against the user record.
    pub async fn store_refresh_token(
        &self,
        subject: Uuid,
        refresh_token: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()> {
        let hash = hash_refresh_token(refresh_token);
        self.users
            .store_refresh_token(subject, &hash, expires_at)
            .await
            .map_err(|e| {
                AppError::with_source(
                    identhub_core::error::ErrorKind::Unauthorized,
                    "Failed to store refresh token",
                    e,
                )
            })
    }

    /// Builds the claim set for a user: identity fields plus the
    /// deduplicated union of direct and group-inherited roles.
    pub async fn build_claims(&self, user: &User) -> AppResult<ClaimSet> {
        let roles = self.roles.resolve(user.id).await?;
        Ok(ClaimSet::for_user(user, roles))
    }

    fn check_user_status(&self, user: &User) -> Result<(), (DenialReason, AppError)> {
        if !user.active {
            return Err((
                DenialReason::UserDeactivated,
                AppError::unauthorized("user is deactivated"),
            ));
        }
        if !user.email_confirmed {
            return Err((
                DenialReason::EmailNotConfirmed,
                AppError::unauthorized("email not confirmed"),
            ));
        }
        Ok(())
    }

    async fn audit_denied(
        &self,
        tenant_id: Option<String>,
        email: Option<String>,
        reason: DenialReason,
    ) {
        self.audit_event(&SecurityEvent::LoginDenied {
            tenant_id,
            email,
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

/// Tenant lifecycle gate. The root tenant is exempt from both the active
/// flag and the validity window.
fn tenant_gate(
    tenant: Option<&Tenant>,
    now: DateTime<Utc>,
) -> Result<(), (DenialReason, AppError)> {
    let Some(tenant) = tenant else {
        return Err((
            DenialReason::UnknownTenant,
            AppError::unauthorized("tenant context is missing or invalid"),
        ));
    };

    if tenant.is_root() {
        return Ok(());
    }

    if !tenant.active {
        return Err((
            DenialReason::TenantDeactivated,
            AppError::unauthorized(format!("tenant {} is deactivated", tenant.id)),
        ));
    }

    if tenant.is_expired(now) {
        return Err((
            DenialReason::TenantExpired,
            AppError::unauthorized(format!("tenant {} has expired", tenant.id)),
        ));
    }

    Ok(())
}
