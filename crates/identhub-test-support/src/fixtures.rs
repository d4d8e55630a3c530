//! Ready-made entity values for tests.
//!
//! Builders return plausible live records; tests mutate the fields they
//! care about. Password hashes are taken as parameters so this crate does
//! not depend on any particular hasher.

use chrono::{Duration, Utc};
use uuid::Uuid;

use identhub_entity::session::{DeviceType, Session};
use identhub_entity::tenant::Tenant;
use identhub_entity::user::User;

/// An active tenant with no expiry window.
pub fn tenant(id: &str) -> Tenant {
    Tenant {
        id: id.to_string(),
        name: id.to_string(),
        active: true,
        valid_until: None,
        created_at: Utc::now(),
    }
}

/// An active, confirmed user with a freshly-changed password.
pub fn user(tenant_id: &str, email: &str, password_hash: &str) -> User {
    let now = Utc::now();
    let local = email.split('@').next().expect("email has a local part");
    User {
        id: Uuid::new_v4(),
        tenant_id: tenant_id.to_string(),
        email: email.to_string(),
        username: local.to_string(),
        username_normalized: local.to_lowercase(),
        display_name: local.to_string(),
        phone: None,
        image_url: None,
        password_hash: password_hash.to_string(),
        active: true,
        email_confirmed: true,
        password_changed_at: now,
        refresh_token_hash: None,
        refresh_token_expires_at: None,
        created_at: now,
        updated_at: now,
    }
}

/// A live desktop session for the given user, expiring in seven days.
pub fn session(user: &User, refresh_token_hash: &str) -> Session {
    let now = Utc::now();
    Session {
        id: Uuid::new_v4(),
        user_id: user.id,
        tenant_id: user.tenant_id.clone(),
        refresh_token_hash: refresh_token_hash.to_string(),
        ip_address: Some("203.0.113.7".to_string()),
        user_agent: None,
        device_type: DeviceType::Desktop,
        browser: None,
        operating_system: None,
        revoked: false,
        revoked_at: None,
        revoked_by: None,
        revoked_reason: None,
        revoked_tenant_id: None,
        created_at: now,
        last_activity_at: now,
        expires_at: now + Duration::days(7),
    }
}
