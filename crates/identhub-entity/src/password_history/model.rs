//! Password history entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A retained snapshot of a user's previous password hash.
///
/// Appended on every successful password change and pruned so at most the
/// configured number of entries survive per user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PasswordHistoryEntry {
    /// Unique entry identifier.
    pub id: Uuid,
    /// The user this entry belongs to.
    pub user_id: Uuid,
    /// The retained password hash.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// When the entry was recorded.
    pub created_at: DateTime<Utc>,
}

impl PasswordHistoryEntry {
    /// Build a new entry for the given user and hash, stamped now.
    pub fn new(user_id: Uuid, password_hash: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            password_hash: password_hash.into(),
            created_at: Utc::now(),
        }
    }
}
