//! User identity entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A user identity scoped to a tenant.
///
/// Identities are never hard-deleted; deactivation clears the `active`
/// flag and leaves the row (and its audit trail) in place.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Unique user identifier.
    pub id: Uuid,
    /// The tenant this identity belongs to.
    pub tenant_id: String,
    /// Email address, stored normalized (trimmed, lowercase). Unique per
    /// tenant.
    pub email: String,
    /// Login name as entered at registration.
    pub username: String,
    /// Normalized login name used for lookups. Unique per tenant.
    pub username_normalized: String,
    /// Human-readable display name.
    pub display_name: String,
    /// Phone number (optional).
    pub phone: Option<String>,
    /// Profile image URL (optional).
    pub image_url: Option<String>,
    /// Argon2 password hash.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Whether the account may authenticate.
    pub active: bool,
    /// Whether the email address has been confirmed.
    pub email_confirmed: bool,
    /// When the password was last changed.
    pub password_changed_at: DateTime<Utc>,
    /// SHA-256 hash of the current refresh token, if one is outstanding.
    #[serde(skip_serializing)]
    pub refresh_token_hash: Option<String>,
    /// When the current refresh token expires.
    pub refresh_token_expires_at: Option<DateTime<Utc>>,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether the stored refresh token exists and has not expired.
    pub fn has_live_refresh_token(&self, now: DateTime<Utc>) -> bool {
        match (&self.refresh_token_hash, self.refresh_token_expires_at) {
            (Some(_), Some(expires_at)) => expires_at > now,
            _ => false,
        }
    }
}

/// Data required to create a new user identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    /// Owning tenant.
    pub tenant_id: String,
    /// Normalized email address.
    pub email: String,
    /// Login name as entered.
    pub username: String,
    /// Display name.
    pub display_name: String,
    /// Phone number (optional).
    pub phone: Option<String>,
    /// Profile image URL (optional).
    pub image_url: Option<String>,
    /// Pre-hashed password.
    pub password_hash: String,
    /// Whether the email starts out confirmed (e.g. admin-provisioned
    /// accounts).
    pub email_confirmed: bool,
}

/// Data for updating an existing user's profile fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateUserProfile {
    /// New display name.
    pub display_name: Option<String>,
    /// New phone number.
    pub phone: Option<String>,
    /// New profile image URL.
    pub image_url: Option<String>,
}
