//! In-memory implementations of the store traits.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use identhub_core::error::AppError;
use identhub_core::types::{PageRequest, PageResponse};
use identhub_core::AppResult;
use identhub_database::stores::{
    PasswordHistoryStore, RoleStore, SessionStore, TenantDirectory, UserStore,
};
use identhub_entity::password_history::PasswordHistoryEntry;
use identhub_entity::session::{Session, SessionWithUser};
use identhub_entity::tenant::Tenant;
use identhub_entity::user::{NewUser, UpdateUserProfile, User};

/// One struct implementing all five store traits over shared maps, so a
/// combined operation like refresh rotation mutates user and session state
/// together the way the SQL implementation does.
///
/// A fresh instance already contains the root tenant.
#[derive(Debug, Default)]
pub struct MemoryStores {
    users: DashMap<Uuid, User>,
    sessions: DashMap<Uuid, Session>,
    history: DashMap<Uuid, Vec<PasswordHistoryEntry>>,
    direct_roles: DashMap<Uuid, BTreeSet<String>>,
    inherited_roles: DashMap<Uuid, BTreeSet<String>>,
    tenants: DashMap<String, Tenant>,
}

impl MemoryStores {
    pub fn new() -> Self {
        let stores = Self::default();
        stores.put_tenant(crate::fixtures::tenant(Tenant::ROOT_ID));
        stores
    }

    /// Inserts or replaces a tenant record.
    pub fn put_tenant(&self, tenant: Tenant) {
        self.tenants.insert(tenant.id.clone(), tenant);
    }

    /// Inserts or replaces a user row directly, bypassing uniqueness checks.
    pub fn put_user(&self, user: User) {
        self.users.insert(user.id, user);
    }

    /// Inserts or replaces a session row directly.
    pub fn put_session(&self, session: Session) {
        self.sessions.insert(session.id, session);
    }

    /// Grants roles to a user as if inherited through group membership.
    pub fn put_inherited_roles(&self, user_id: Uuid, roles: &[&str]) {
        self.inherited_roles
            .entry(user_id)
            .or_default()
            .extend(roles.iter().map(|r| r.to_string()));
    }

    /// Returns a snapshot of a user row.
    pub fn user(&self, id: Uuid) -> Option<User> {
        self.users.get(&id).map(|u| u.clone())
    }

    /// Returns a snapshot of a session row.
    pub fn session(&self, id: Uuid) -> Option<Session> {
        self.sessions.get(&id).map(|s| s.clone())
    }

    /// Number of history entries currently retained for a user.
    pub fn history_len(&self, user_id: Uuid) -> usize {
        self.history.get(&user_id).map(|h| h.len()).unwrap_or(0)
    }
}

#[async_trait]
impl UserStore for MemoryStores {
    async fn find_by_id(&self, tenant_id: &str, id: Uuid) -> AppResult<Option<User>> {
        Ok(self
            .users
            .get(&id)
            .filter(|u| u.tenant_id == tenant_id)
            .map(|u| u.clone()))
    }

    async fn find_by_email(&self, tenant_id: &str, email: &str) -> AppResult<Option<User>> {
        let needle = email.to_lowercase();
        Ok(self
            .users
            .iter()
            .find(|u| u.tenant_id == tenant_id && u.email.to_lowercase() == needle)
            .map(|u| u.clone()))
    }

    async fn find_by_refresh_token_hash(
        &self,
        tenant_id: &str,
        hash: &str,
    ) -> AppResult<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|u| u.tenant_id == tenant_id && u.refresh_token_hash.as_deref() == Some(hash))
            .map(|u| u.clone()))
    }

    async fn insert(&self, data: &NewUser) -> AppResult<User> {
        let email_lower = data.email.to_lowercase();
        let username_lower = data.username.to_lowercase();
        for existing in self.users.iter() {
            if existing.tenant_id != data.tenant_id {
                continue;
            }
            if existing.email.to_lowercase() == email_lower {
                return Err(AppError::conflict("Email is already registered"));
            }
            if existing.username_normalized == username_lower {
                return Err(AppError::conflict("Username is already taken"));
            }
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            tenant_id: data.tenant_id.clone(),
            email: data.email.clone(),
            username: data.username.clone(),
            username_normalized: username_lower,
            display_name: data.display_name.clone(),
            phone: data.phone.clone(),
            image_url: data.image_url.clone(),
            password_hash: data.password_hash.clone(),
            active: true,
            email_confirmed: data.email_confirmed,
            password_changed_at: now,
            refresh_token_hash: None,
            refresh_token_expires_at: None,
            created_at: now,
            updated_at: now,
        };
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_profile(
        &self,
        tenant_id: &str,
        id: Uuid,
        update: &UpdateUserProfile,
    ) -> AppResult<User> {
        let mut user = self
            .users
            .get_mut(&id)
            .filter(|u| u.tenant_id == tenant_id)
            .ok_or_else(|| AppError::not_found(format!("User {id} not found")))?;

        if let Some(display_name) = &update.display_name {
            user.display_name = display_name.clone();
        }
        if let Some(phone) = &update.phone {
            user.phone = Some(phone.clone());
        }
        if let Some(image_url) = &update.image_url {
            user.image_url = Some(image_url.clone());
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn set_active(&self, tenant_id: &str, id: Uuid, active: bool) -> AppResult<User> {
        let mut user = self
            .users
            .get_mut(&id)
            .filter(|u| u.tenant_id == tenant_id)
            .ok_or_else(|| AppError::not_found(format!("User {id} not found")))?;
        user.active = active;
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
        changed_at: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut user = self
            .users
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("User {id} not found")))?;
        user.password_hash = password_hash.to_string();
        user.password_changed_at = changed_at;
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> AppResult<()> {
        let mut user = self
            .users
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("User {id} not found")))?;
        user.password_hash = password_hash.to_string();
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn store_refresh_token(
        &self,
        id: Uuid,
        hash: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut user = self
            .users
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("User {id} not found")))?;
        user.refresh_token_hash = Some(hash.to_string());
        user.refresh_token_expires_at = Some(expires_at);
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn list(&self, tenant_id: &str, page: &PageRequest) -> AppResult<PageResponse<User>> {
        let mut users: Vec<User> = self
            .users
            .iter()
            .filter(|u| u.tenant_id == tenant_id)
            .map(|u| u.clone())
            .collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = users.len() as u64;
        let items = users
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect();
        Ok(PageResponse::new(items, page.page, page.page_size, total))
    }
}

#[async_trait]
impl SessionStore for MemoryStores {
    async fn insert(&self, session: &Session) -> AppResult<Session> {
        self.sessions.insert(session.id, session.clone());
        Ok(session.clone())
    }

    async fn find_by_id(&self, tenant_id: &str, id: Uuid) -> AppResult<Option<Session>> {
        Ok(self
            .sessions
            .get(&id)
            .filter(|s| s.tenant_id == tenant_id)
            .map(|s| s.clone()))
    }

    async fn find_by_refresh_token_hash(
        &self,
        tenant_id: &str,
        hash: &str,
    ) -> AppResult<Option<Session>> {
        Ok(self
            .sessions
            .iter()
            .find(|s| s.tenant_id == tenant_id && s.refresh_token_hash == hash)
            .map(|s| s.clone()))
    }

    async fn find_active_by_user(
        &self,
        tenant_id: &str,
        user_id: Uuid,
    ) -> AppResult<Vec<Session>> {
        let now = Utc::now();
        let mut sessions: Vec<Session> = self
            .sessions
            .iter()
            .filter(|s| {
                s.tenant_id == tenant_id && s.user_id == user_id && !s.revoked && s.expires_at > now
            })
            .map(|s| s.clone())
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }

    async fn find_active_by_user_with_identity(
        &self,
        tenant_id: &str,
        user_id: Uuid,
    ) -> AppResult<Vec<SessionWithUser>> {
        let sessions = self.find_active_by_user(tenant_id, user_id).await?;
        Ok(sessions
            .into_iter()
            .filter_map(|session| {
                let user = self.users.get(&session.user_id)?;
                Some(SessionWithUser {
                    user_email: user.email.clone(),
                    user_display_name: user.display_name.clone(),
                    session,
                })
            })
            .collect())
    }

    async fn touch_by_refresh_token_hash(&self, tenant_id: &str, hash: &str) -> AppResult<bool> {
        for mut session in self.sessions.iter_mut() {
            if session.tenant_id == tenant_id
                && session.refresh_token_hash == hash
                && !session.revoked
            {
                session.last_activity_at = Utc::now();
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn revoke(
        &self,
        tenant_id: &str,
        id: Uuid,
        revoked_by: Uuid,
        reason: &str,
        revoked_tenant_id: &str,
    ) -> AppResult<bool> {
        let Some(mut session) = self.sessions.get_mut(&id) else {
            return Ok(false);
        };
        if session.tenant_id != tenant_id || session.revoked {
            return Ok(false);
        }
        session.revoked = true;
        session.revoked_at = Some(Utc::now());
        session.revoked_by = Some(revoked_by);
        session.revoked_reason = Some(reason.to_string());
        session.revoked_tenant_id = Some(revoked_tenant_id.to_string());
        Ok(true)
    }

    async fn revoke_all_for_user(
        &self,
        tenant_id: &str,
        user_id: Uuid,
        revoked_by: Uuid,
        except: Option<Uuid>,
        reason: &str,
        revoked_tenant_id: &str,
    ) -> AppResult<u64> {
        let now = Utc::now();
        let mut revoked = 0u64;
        for mut session in self.sessions.iter_mut() {
            if session.tenant_id != tenant_id
                || session.user_id != user_id
                || session.revoked
                || session.expires_at <= now
                || except == Some(session.id)
            {
                continue;
            }
            session.revoked = true;
            session.revoked_at = Some(now);
            session.revoked_by = Some(revoked_by);
            session.revoked_reason = Some(reason.to_string());
            session.revoked_tenant_id = Some(revoked_tenant_id.to_string());
            revoked += 1;
        }
        Ok(revoked)
    }

    async fn rotate_refresh_binding(
        &self,
        user_id: Uuid,
        old_hash: &str,
        new_hash: &str,
        new_expires_at: DateTime<Utc>,
    ) -> AppResult<()> {
        {
            let mut user = self
                .users
                .get_mut(&user_id)
                .ok_or_else(|| AppError::not_found(format!("User {user_id} not found")))?;
            user.refresh_token_hash = Some(new_hash.to_string());
            user.refresh_token_expires_at = Some(new_expires_at);
            user.updated_at = Utc::now();
        }

        for mut session in self.sessions.iter_mut() {
            if session.refresh_token_hash == old_hash && !session.revoked {
                session.refresh_token_hash = new_hash.to_string();
                session.expires_at = new_expires_at;
                session.last_activity_at = Utc::now();
            }
        }
        Ok(())
    }

    async fn purge_expired_before(
        &self,
        now: DateTime<Utc>,
        cutoff: DateTime<Utc>,
    ) -> AppResult<u64> {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, s| !(s.expires_at < now && s.expires_at < cutoff));
        Ok((before - self.sessions.len()) as u64)
    }
}

#[async_trait]
impl PasswordHistoryStore for MemoryStores {
    async fn recent(&self, user_id: Uuid, limit: u32) -> AppResult<Vec<PasswordHistoryEntry>> {
        let mut entries = self
            .history
            .get(&user_id)
            .map(|h| h.clone())
            .unwrap_or_default();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries.truncate(limit as usize);
        Ok(entries)
    }

    async fn append(&self, entry: &PasswordHistoryEntry) -> AppResult<()> {
        self.history
            .entry(entry.user_id)
            .or_default()
            .push(entry.clone());
        Ok(())
    }

    async fn prune(&self, user_id: Uuid, keep: u32) -> AppResult<u64> {
        let Some(mut entries) = self.history.get_mut(&user_id) else {
            return Ok(0);
        };
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let before = entries.len();
        entries.truncate(keep as usize);
        Ok((before - entries.len()) as u64)
    }
}

#[async_trait]
impl RoleStore for MemoryStores {
    async fn direct_roles(&self, user_id: Uuid) -> AppResult<Vec<String>> {
        Ok(self
            .direct_roles
            .get(&user_id)
            .map(|r| r.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn group_roles(&self, user_id: Uuid) -> AppResult<Vec<String>> {
        Ok(self
            .inherited_roles
            .get(&user_id)
            .map(|r| r.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn assign_role(&self, user_id: Uuid, role: &str) -> AppResult<bool> {
        Ok(self
            .direct_roles
            .entry(user_id)
            .or_default()
            .insert(role.to_string()))
    }

    async fn remove_role(&self, user_id: Uuid, role: &str) -> AppResult<bool> {
        Ok(self
            .direct_roles
            .get_mut(&user_id)
            .map(|mut roles| roles.remove(role))
            .unwrap_or(false))
    }

    async fn count_active_role_holders(&self, tenant_id: &str, role: &str) -> AppResult<u64> {
        let count = self
            .users
            .iter()
            .filter(|u| u.tenant_id == tenant_id && u.active)
            .filter(|u| {
                let direct = self
                    .direct_roles
                    .get(&u.id)
                    .is_some_and(|r| r.contains(role));
                let inherited = self
                    .inherited_roles
                    .get(&u.id)
                    .is_some_and(|r| r.contains(role));
                direct || inherited
            })
            .count();
        Ok(count as u64)
    }
}

#[async_trait]
impl TenantDirectory for MemoryStores {
    async fn lookup(&self, tenant_id: &str) -> AppResult<Option<Tenant>> {
        Ok(self.tenants.get(tenant_id).map(|t| t.clone()))
    }
}
