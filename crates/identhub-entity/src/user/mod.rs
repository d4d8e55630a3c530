//! User identity domain entities.

pub mod model;

pub use model::{NewUser, UpdateUserProfile, User};

/// Role name of the distinguished administrator role.
///
/// The last active holder of this role in a tenant can never be
/// deactivated.
pub const ADMIN_ROLE: &str = "administrator";
