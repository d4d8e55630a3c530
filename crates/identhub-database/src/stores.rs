//! Store traits that decouple the credential, token, and session logic
//! from the concrete PostgreSQL repositories.
//!
//! Production wiring uses the implementations in [`crate::repositories`];
//! tests substitute in-memory doubles.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use identhub_core::types::{PageRequest, PageResponse};
use identhub_core::AppResult;
use identhub_entity::password_history::PasswordHistoryEntry;
use identhub_entity::session::{Session, SessionWithUser};
use identhub_entity::tenant::Tenant;
use identhub_entity::user::{NewUser, UpdateUserProfile, User};

/// Persistence operations on user accounts.
///
/// Lookup methods are tenant-scoped: a caller can only see rows belonging
/// to the tenant it passes in.
#[async_trait]
pub trait UserStore: Send + Sync + 'static {
    /// Finds a user by id within a tenant.
    async fn find_by_id(&self, tenant_id: &str, id: Uuid) -> AppResult<Option<User>>;

    /// Finds a user by email (case-insensitive) within a tenant.
    async fn find_by_email(&self, tenant_id: &str, email: &str) -> AppResult<Option<User>>;

    /// Finds the user whose current refresh token hash matches, within a tenant.
    async fn find_by_refresh_token_hash(
        &self,
        tenant_id: &str,
        hash: &str,
    ) -> AppResult<Option<User>>;

    /// Inserts a new user and returns the stored row.
    async fn insert(&self, data: &NewUser) -> AppResult<User>;

    /// Applies a partial profile update and returns the updated row.
    async fn update_profile(
        &self,
        tenant_id: &str,
        id: Uuid,
        update: &UpdateUserProfile,
    ) -> AppResult<User>;

    /// Activates or deactivates an account and returns the updated row.
    async fn set_active(&self, tenant_id: &str, id: Uuid, active: bool) -> AppResult<User>;

    /// Replaces the password hash and records when the password changed.
    async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
        changed_at: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Replaces the password hash without touching the change timestamp.
    ///
    /// Used when re-hashing an unchanged password under new cost parameters.
    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> AppResult<()>;

    /// Stores the hash and expiry of the user's current refresh token.
    async fn store_refresh_token(
        &self,
        id: Uuid,
        hash: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Lists users in a tenant, newest first.
    async fn list(&self, tenant_id: &str, page: &PageRequest) -> AppResult<PageResponse<User>>;
}

/// Persistence operations on device sessions.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Inserts a new session row.
    async fn insert(&self, session: &Session) -> AppResult<Session>;

    /// Finds a session by id within a tenant.
    async fn find_by_id(&self, tenant_id: &str, id: Uuid) -> AppResult<Option<Session>>;

    /// Finds the session bound to the given refresh token hash.
    async fn find_by_refresh_token_hash(
        &self,
        tenant_id: &str,
        hash: &str,
    ) -> AppResult<Option<Session>>;

    /// Lists a user's live (non-revoked, non-expired) sessions, newest first.
    async fn find_active_by_user(&self, tenant_id: &str, user_id: Uuid)
        -> AppResult<Vec<Session>>;

    /// Like [`Self::find_active_by_user`], joined with the owning user's identity.
    async fn find_active_by_user_with_identity(
        &self,
        tenant_id: &str,
        user_id: Uuid,
    ) -> AppResult<Vec<SessionWithUser>>;

    /// Bumps `last_activity_at` on the live session bound to the hash.
    ///
    /// Returns `false` when no live session matches.
    async fn touch_by_refresh_token_hash(&self, tenant_id: &str, hash: &str) -> AppResult<bool>;

    /// Marks a single session revoked, recording who did it and why.
    ///
    /// Returns `false` when the session was already revoked or does not
    /// exist, so repeated revocations are no-ops.
    async fn revoke(
        &self,
        tenant_id: &str,
        id: Uuid,
        revoked_by: Uuid,
        reason: &str,
        revoked_tenant_id: &str,
    ) -> AppResult<bool>;

    /// Revokes every live session of a user, optionally keeping one.
    ///
    /// Returns the number of sessions revoked.
    async fn revoke_all_for_user(
        &self,
        tenant_id: &str,
        user_id: Uuid,
        revoked_by: Uuid,
        except: Option<Uuid>,
        reason: &str,
        revoked_tenant_id: &str,
    ) -> AppResult<u64>;

    /// Atomically moves the refresh token binding from `old_hash` to `new_hash`.
    ///
    /// Updates the user row and the matching session row in one transaction
    /// so a crash between the two writes cannot leave them disagreeing.
    /// Finding no session bound to `old_hash` is not an error.
    async fn rotate_refresh_binding(
        &self,
        user_id: Uuid,
        old_hash: &str,
        new_hash: &str,
        new_expires_at: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Deletes sessions that expired before both `now` and `cutoff`.
    ///
    /// Returns the number of rows deleted.
    async fn purge_expired_before(
        &self,
        now: DateTime<Utc>,
        cutoff: DateTime<Utc>,
    ) -> AppResult<u64>;
}

/// Persistence operations on the password history ring.
#[async_trait]
pub trait PasswordHistoryStore: Send + Sync + 'static {
    /// Returns up to `limit` most recent history entries, newest first.
    async fn recent(&self, user_id: Uuid, limit: u32) -> AppResult<Vec<PasswordHistoryEntry>>;

    /// Appends a new history entry.
    async fn append(&self, entry: &PasswordHistoryEntry) -> AppResult<()>;

    /// Deletes all but the `keep` most recent entries for a user.
    ///
    /// Returns the number of rows deleted.
    async fn prune(&self, user_id: Uuid, keep: u32) -> AppResult<u64>;
}

/// Read and write access to role assignments.
#[async_trait]
pub trait RoleStore: Send + Sync + 'static {
    /// Returns the roles assigned directly to a user.
    async fn direct_roles(&self, user_id: Uuid) -> AppResult<Vec<String>>;

    /// Returns the roles a user inherits through group membership.
    async fn group_roles(&self, user_id: Uuid) -> AppResult<Vec<String>>;

    /// Assigns a role directly to a user. Returns `false` if already assigned.
    async fn assign_role(&self, user_id: Uuid, role: &str) -> AppResult<bool>;

    /// Removes a direct role assignment. Returns `false` if it was absent.
    async fn remove_role(&self, user_id: Uuid, role: &str) -> AppResult<bool>;

    /// Counts active users in a tenant holding the role, directly or via a group.
    async fn count_active_role_holders(&self, tenant_id: &str, role: &str) -> AppResult<u64>;
}

/// Read access to tenant records.
#[async_trait]
pub trait TenantDirectory: Send + Sync + 'static {
    /// Looks up a tenant by id.
    async fn lookup(&self, tenant_id: &str) -> AppResult<Option<Tenant>>;
}
