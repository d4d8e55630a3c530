//! Password hashing, strength validation, and hygiene policy.

pub mod hasher;
pub mod policy;
pub mod strength;

pub use hasher::Argon2Hasher;
pub use policy::{PasswordPolicy, PasswordStatus};
pub use strength::PasswordStrength;
