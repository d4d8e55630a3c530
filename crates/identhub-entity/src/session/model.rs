//! Session entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::device::DeviceType;

/// One authenticated device/login.
///
/// Created at login, touched on activity and refresh rotation, ended by
/// explicit revocation or expiry. Expired rows are kept for a retention
/// window so revocation history stays inspectable, then purged by the
/// janitor.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    /// Unique session identifier.
    pub id: Uuid,
    /// The user this session belongs to.
    pub user_id: Uuid,
    /// The tenant the session was created under.
    pub tenant_id: String,
    /// SHA-256 hash of the refresh token bound to this session.
    #[serde(skip_serializing)]
    pub refresh_token_hash: String,
    /// IP address from which the session was created.
    pub ip_address: Option<String>,
    /// User-Agent header value.
    pub user_agent: Option<String>,
    /// Coarse device classification.
    pub device_type: DeviceType,
    /// Parsed browser name.
    pub browser: Option<String>,
    /// Parsed operating system name.
    pub operating_system: Option<String>,

    // -- Revocation --
    /// Whether the session has been revoked.
    pub revoked: bool,
    /// When the session was revoked.
    pub revoked_at: Option<DateTime<Utc>>,
    /// Who revoked it (the user themselves, or an admin).
    pub revoked_by: Option<Uuid>,
    /// Why it was revoked.
    pub revoked_reason: Option<String>,
    /// The tenant the revoking caller acted under.
    pub revoked_tenant_id: Option<String>,

    // -- Timestamps --
    /// When the session was created (login time).
    pub created_at: DateTime<Utc>,
    /// Last activity timestamp.
    pub last_activity_at: DateTime<Utc>,
    /// When the session expires (follows the refresh-token expiry).
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Whether the session has expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Whether the session is live: not revoked and not expired.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && !self.is_expired(now)
    }
}

/// A session joined with the owning user's display fields.
///
/// Returned by the admin session listing so the UI does not need a second
/// lookup per row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SessionWithUser {
    /// The session row.
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub session: Session,
    /// The owning user's email.
    pub user_email: String,
    /// The owning user's display name.
    pub user_display_name: String,
}
