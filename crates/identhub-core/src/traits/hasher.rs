//! Password hashing capability trait.

use crate::result::AppResult;

/// Outcome of verifying a plaintext against a stored hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// The plaintext matches the hash.
    Valid,
    /// The plaintext matches, but the hash was produced with outdated
    /// parameters and should be recomputed.
    ValidNeedsRehash,
    /// The plaintext does not match.
    Invalid,
}

impl VerifyOutcome {
    /// Whether the plaintext matched, regardless of rehash advice.
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid | Self::ValidNeedsRehash)
    }
}

/// Trait for password hashing backends.
///
/// Hashing is CPU-bound and treated as a blocking call; implementations do
/// not suspend. Callers on an async path invoke it inline.
pub trait CredentialHasher: Send + Sync + 'static {
    /// Hash a plaintext password.
    fn hash(&self, plain: &str) -> AppResult<String>;

    /// Verify a plaintext password against a stored hash.
    ///
    /// A malformed stored hash is an error; a mismatched password is the
    /// `Invalid` outcome, not an error.
    fn verify(&self, hash: &str, plain: &str) -> AppResult<VerifyOutcome>;
}
