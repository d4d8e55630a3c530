//! User directory — registration, profile updates, status toggles with
//! policy guards, password changes, and role membership writes.

use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use identhub_auth::password::{PasswordPolicy, PasswordStrength};
use identhub_auth::roles::RoleResolver;
use identhub_core::context::RequestContext;
use identhub_core::error::AppError;
use identhub_core::events::{PolicyCode, SecurityEvent};
use identhub_core::traits::{AuditSink, CredentialHasher};
use identhub_core::types::{PageRequest, PageResponse};
use identhub_core::AppResult;
use identhub_database::stores::{RoleStore, UserStore};
use identhub_entity::user::{ADMIN_ROLE, NewUser, UpdateUserProfile, User};

/// Request to register a new user.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RegisterUser {
    /// Email address (unique per tenant).
    pub email: String,
    /// Login name (unique per tenant).
    pub username: String,
    /// Display name.
    pub display_name: String,
    /// Phone number (optional).
    pub phone: Option<String>,
    /// Profile image URL (optional).
    pub image_url: Option<String>,
    /// Initial password, validated for strength before hashing.
    pub password: String,
    /// Whether the email starts out confirmed (admin-provisioned accounts).
    pub email_confirmed: bool,
}

/// CRUD over user identity records, with the policy guards that protect
/// account status and credentials.
#[derive(Clone)]
pub struct UserDirectory {
    users: Arc<dyn UserStore>,
    roles: Arc<dyn RoleStore>,
    resolver: Arc<RoleResolver>,
    hasher: Arc<dyn CredentialHasher>,
    strength: PasswordStrength,
    policy: Arc<PasswordPolicy>,
    audit: Arc<dyn AuditSink>,
}

impl std::fmt::Debug for UserDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserDirectory")
            .field("strength", &self.strength)
            .finish()
    }
}

impl UserDirectory {
    pub fn new(
        users: Arc<dyn UserStore>,
        roles: Arc<dyn RoleStore>,
        resolver: Arc<RoleResolver>,
        hasher: Arc<dyn CredentialHasher>,
        strength: PasswordStrength,
        policy: Arc<PasswordPolicy>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            users,
            roles,
            resolver,
            hasher,
            strength,
            policy,
            audit,
        }
    }

    /// Registers a new user under the context's tenant.
    ///
    /// Normalizes the email, validates password strength, hashes, and
    /// inserts. Duplicate email or username within the tenant fails
    /// `Conflict`.
    pub async fn register_user(&self, ctx: &RequestContext, req: RegisterUser) -> AppResult<User> {
        let tenant_id = ctx.require_tenant()?.to_string();

        let email = req.email.trim().to_lowercase();
        if !email.contains('@') || !email.contains('.') {
            return Err(AppError::validation("Invalid email format"));
        }

        let username = req.username.trim().to_string();
        if username.len() < 3 {
            return Err(AppError::validation("Username must be at least 3 characters"));
        }

        self.strength.validate(&req.password)?;
        let password_hash = self.hasher.hash(&req.password)?;

        let user = self
            .users
            .insert(&NewUser {
                tenant_id: tenant_id.clone(),
                email,
                username,
                display_name: req.display_name,
                phone: req.phone,
                image_url: req.image_url,
                password_hash,
                email_confirmed: req.email_confirmed,
            })
            .await?;

        // Self-registration has no authenticated caller; attribute the
        // entry to the new account itself.
        let actor = ctx.caller_id.unwrap_or(user.id);
        self.audit_activity(
            actor,
            &tenant_id,
            "user.registered",
            json!({ "user_id": user.id, "email": user.email }),
        )
        .await;

        info!(user_id = %user.id, tenant_id = %tenant_id, "User registered");

        Ok(user)
    }

    /// Fetches a user by id within the context's tenant.
    pub async fn get_user(&self, ctx: &RequestContext, user_id: Uuid) -> AppResult<User> {
        let tenant_id = ctx.require_tenant()?;
        self.users
            .find_by_id(tenant_id, user_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User {user_id} not found")))
    }

    /// Lists users in the context's tenant, newest first.
    pub async fn list_users(
        &self,
        ctx: &RequestContext,
        page: &PageRequest,
    ) -> AppResult<PageResponse<User>> {
        let tenant_id = ctx.require_tenant()?;
        self.users.list(tenant_id, page).await
    }

    /// Applies a partial profile update.
    pub async fn update_profile(
        &self,
        ctx: &RequestContext,
        user_id: Uuid,
        update: &UpdateUserProfile,
    ) -> AppResult<User> {
        let tenant_id = ctx.require_tenant()?.to_string();
        let caller = ctx.require_caller()?;

        if let Some(display_name) = &update.display_name {
            if display_name.trim().is_empty() {
                return Err(AppError::validation("Display name cannot be empty"));
            }
        }

        let user = self.users.update_profile(&tenant_id, user_id, update).await?;

        self.audit_activity(
            caller,
            &tenant_id,
            "user.profile_updated",
            json!({ "user_id": user_id }),
        )
        .await;

        info!(user_id = %user_id, "Profile updated");

        Ok(user)
    }

    /// Activates or deactivates an account.
    ///
    /// Deactivation is guarded: a caller cannot deactivate themselves, and
    /// the last active administrator of a tenant cannot be deactivated.
    /// Each guard failure is a `Conflict` paired with one `PolicyFailed`
    /// audit event. Reactivation has no guards.
    pub async fn set_active(
        &self,
        ctx: &RequestContext,
        user_id: Uuid,
        active: bool,
    ) -> AppResult<User> {
        let tenant_id = ctx.require_tenant()?.to_string();
        let caller = ctx.require_caller()?;

        if !active && caller == user_id {
            self.policy_failed(Some(caller), Some(user_id), PolicyCode::SelfDeactivation)
                .await;
            return Err(AppError::conflict("cannot self-deactivate"));
        }

        let user = self
            .users
            .find_by_id(&tenant_id, user_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User {user_id} not found")))?;

        if !active && user.active && self.is_last_active_administrator(&tenant_id, user_id).await? {
            self.policy_failed(Some(caller), Some(user_id), PolicyCode::LastAdministrator)
                .await;
            return Err(AppError::conflict(
                "cannot deactivate the last active administrator",
            ));
        }

        let updated = self.users.set_active(&tenant_id, user_id, active).await?;

        let action = if active { "user.activated" } else { "user.deactivated" };
        self.audit_activity(caller, &tenant_id, action, json!({ "user_id": user_id }))
            .await;

        info!(user_id = %user_id, active, "User status changed");

        Ok(updated)
    }

    /// Changes the caller's own password after verifying the current one.
    pub async fn change_password(
        &self,
        ctx: &RequestContext,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> AppResult<()> {
        let tenant_id = ctx.require_tenant()?.to_string();
        let caller = ctx.require_caller()?;

        if caller != user_id {
            return Err(AppError::unauthorized("you can only change your own password"));
        }

        let user = self
            .users
            .find_by_id(&tenant_id, user_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User {user_id} not found")))?;

        // The caller is authenticated, so this message can be specific.
        if !self.hasher.verify(&user.password_hash, current_password)?.is_valid() {
            return Err(AppError::unauthorized("Current password is incorrect"));
        }

        self.apply_new_password(ctx, &user, caller, new_password).await
    }

    /// Sets a user's password without a current-password check.
    pub async fn reset_password(
        &self,
        ctx: &RequestContext,
        user_id: Uuid,
        new_password: &str,
    ) -> AppResult<()> {
        let tenant_id = ctx.require_tenant()?.to_string();
        let caller = ctx.require_caller()?;

        let user = self
            .users
            .find_by_id(&tenant_id, user_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User {user_id} not found")))?;

        self.apply_new_password(ctx, &user, caller, new_password).await
    }

    /// Assigns a role directly to a user. Returns `false` when the user
    /// already held it.
    pub async fn assign_role(
        &self,
        ctx: &RequestContext,
        user_id: Uuid,
        role: &str,
    ) -> AppResult<bool> {
        let tenant_id = ctx.require_tenant()?.to_string();
        let caller = ctx.require_caller()?;

        let role = role.trim();
        if role.is_empty() {
            return Err(AppError::validation("Role name cannot be empty"));
        }

        // Role tables are keyed by user id alone; scoping through the user
        // lookup keeps cross-tenant writes impossible.
        self.users
            .find_by_id(&tenant_id, user_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User {user_id} not found")))?;

        let assigned = self.roles.assign_role(user_id, role).await?;
        if assigned {
            self.resolver.invalidate(user_id).await;
            self.audit_activity(
                caller,
                &tenant_id,
                "user.role_assigned",
                json!({ "user_id": user_id, "role": role }),
            )
            .await;
            info!(user_id = %user_id, role = %role, "Role assigned");
        }

        Ok(assigned)
    }

    /// Removes a direct role assignment. Returns `false` when the user did
    /// not hold it.
    ///
    /// Removing the administrator role is guarded the same way as
    /// deactivation: the tenant must not lose its last active
    /// administrator. A user who also inherits the role through a group is
    /// exempt, since the removal cannot reduce coverage.
    pub async fn remove_role(
        &self,
        ctx: &RequestContext,
        user_id: Uuid,
        role: &str,
    ) -> AppResult<bool> {
        let tenant_id = ctx.require_tenant()?.to_string();
        let caller = ctx.require_caller()?;

        let role = role.trim();

        let user = self
            .users
            .find_by_id(&tenant_id, user_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User {user_id} not found")))?;

        if role == ADMIN_ROLE && user.active {
            let inherited = self.roles.group_roles(user_id).await?;
            if !inherited.iter().any(|r| r == ADMIN_ROLE)
                && self.is_last_active_administrator(&tenant_id, user_id).await?
            {
                self.policy_failed(Some(caller), Some(user_id), PolicyCode::LastAdministrator)
                    .await;
                return Err(AppError::conflict(
                    "cannot remove the administrator role from the last active administrator",
                ));
            }
        }

        let removed = self.roles.remove_role(user_id, role).await?;
        if removed {
            self.resolver.invalidate(user_id).await;
            self.audit_activity(
                caller,
                &tenant_id,
                "user.role_removed",
                json!({ "user_id": user_id, "role": role }),
            )
            .await;
            info!(user_id = %user_id, role = %role, "Role removed");
        }

        Ok(removed)
    }

    /// Strength check, reuse check, hash, persist, record history.
    ///
    /// Shared tail of `change_password` and `reset_password`.
    async fn apply_new_password(
        &self,
        ctx: &RequestContext,
        user: &User,
        changed_by: Uuid,
        new_password: &str,
    ) -> AppResult<()> {
        self.strength.validate(new_password)?;

        if self.policy.is_password_in_history(user.id, new_password).await? {
            self.policy_failed(Some(changed_by), Some(user.id), PolicyCode::PasswordReuse)
                .await;
            return Err(AppError::validation(
                "Password must not match a recently used password",
            ));
        }

        let new_hash = self.hasher.hash(new_password)?;
        self.users
            .update_password(user.id, &new_hash, ctx.request_time)
            .await?;
        self.policy.record_password_change(user.id, &new_hash).await?;

        self.audit_event(&SecurityEvent::PasswordChanged {
            user_id: user.id,
            changed_by,
        })
        .await;

        info!(user_id = %user.id, changed_by = %changed_by, "Password changed");

        Ok(())
    }

    /// Whether this user is the only active holder of the administrator
    /// role in the tenant, counting direct and group-inherited grants.
    ///
    /// Reads the role store directly rather than the resolver: policy
    /// guards must not act on cached role data.
    async fn is_last_active_administrator(
        &self,
        tenant_id: &str,
        user_id: Uuid,
    ) -> AppResult<bool> {
        let direct = self.roles.direct_roles(user_id).await?;
        let inherited = self.roles.group_roles(user_id).await?;
        if !direct.iter().chain(inherited.iter()).any(|r| r == ADMIN_ROLE) {
            return Ok(false);
        }

        let holders = self
            .roles
            .count_active_role_holders(tenant_id, ADMIN_ROLE)
            .await?;
        Ok(holders <= 1)
    }

    async fn policy_failed(&self, actor_id: Option<Uuid>, target_id: Option<Uuid>, code: PolicyCode) {
        self.audit_event(&SecurityEvent::PolicyFailed {
            actor_id,
            target_id,
            code,
        })
        .await;
    }

    async fn audit_event(&self, event: &SecurityEvent) {
        if let Err(e) = self.audit.security_event(event).await {
            warn!(error = %e, "Failed to write security audit event");
        }
    }

    async fn audit_activity(
        &self,
        actor: Uuid,
        tenant_id: &str,
        action: &str,
        details: serde_json::Value,
    ) {
        if let Err(e) = self.audit.activity(actor, tenant_id, action, details).await {
            warn!(action = %action, error = %e, "Failed to write activity entry");
        }
    }
}
