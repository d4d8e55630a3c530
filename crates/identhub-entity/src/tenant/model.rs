//! Tenant entity model.

use chrono::{DateTime, Utc};
use identhub_core::context::ROOT_TENANT_ID;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A tenant record.
///
/// Read-only to this subsystem; provisioning and migration are owned
/// elsewhere. Login and refresh check `active`/`valid_until` for every
/// tenant except the distinguished root tenant.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tenant {
    /// Tenant identifier (slug).
    pub id: String,
    /// Human-readable tenant name.
    pub name: String,
    /// Whether the tenant is active.
    pub active: bool,
    /// End of the tenant's validity window. `None` means never expires.
    pub valid_until: Option<DateTime<Utc>>,
    /// When the tenant was created.
    pub created_at: DateTime<Utc>,
}

impl Tenant {
    /// Identifier of the distinguished root tenant.
    pub const ROOT_ID: &'static str = ROOT_TENANT_ID;

    /// Whether this is the root tenant.
    pub fn is_root(&self) -> bool {
        self.id == Self::ROOT_ID
    }

    /// Whether the tenant's validity window has passed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.valid_until.is_some_and(|until| now > until)
    }
}
