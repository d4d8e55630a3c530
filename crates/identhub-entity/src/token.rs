//! Token value types and the claim set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::user::User;

/// The identity assertions embedded in an access token.
///
/// Built fresh per issuance; role changes take effect at the next
/// issuance or refresh, never retroactively on outstanding tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimSet {
    /// Subject: the user ID.
    pub sub: Uuid,
    /// Unique token identifier.
    pub jti: Uuid,
    /// The user's email address.
    pub email: String,
    /// The user's display name.
    pub name: String,
    /// The user's phone number, when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// The tenant the token was issued under.
    pub tenant: String,
    /// The user's profile image URL, when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Sorted, deduplicated union of direct and group-inherited role names.
    pub roles: Vec<String>,
}

impl ClaimSet {
    /// Build a claim set for a user with an already-deduplicated role list,
    /// minting a fresh `jti`.
    pub fn for_user(user: &User, roles: Vec<String>) -> Self {
        Self {
            sub: user.id,
            jti: Uuid::new_v4(),
            email: user.email.clone(),
            name: user.display_name.clone(),
            phone: user.phone.clone(),
            tenant: user.tenant_id.clone(),
            image_url: user.image_url.clone(),
            roles,
        }
    }
}

/// A signed access token and its expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedToken {
    /// The raw token string.
    pub token: String,
    /// When the token expires.
    pub expires_at: DateTime<Utc>,
}

/// A random opaque refresh token and its expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpaqueToken {
    /// The raw token string.
    pub token: String,
    /// When the token expires.
    pub expires_at: DateTime<Utc>,
}

/// The access/refresh pair returned on login and refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    /// The signed access token.
    pub access_token: String,
    /// When the access token expires.
    pub access_expires_at: DateTime<Utc>,
    /// The opaque refresh token.
    pub refresh_token: String,
    /// When the refresh token expires.
    pub refresh_expires_at: DateTime<Utc>,
}

impl TokenPair {
    /// Assemble a pair from its two halves.
    pub fn new(access: SignedToken, refresh: OpaqueToken) -> Self {
        Self {
            access_token: access.token,
            access_expires_at: access.expires_at,
            refresh_token: refresh.token,
            refresh_expires_at: refresh.expires_at,
        }
    }
}
