//! A transparent hasher for tests.

use identhub_core::traits::{CredentialHasher, VerifyOutcome};
use identhub_core::AppResult;

/// Hashes by prefixing the plaintext, so tests stay fast and can seed
/// hashes by hand. A `stale$` prefix verifies as needing a rehash, which
/// lets tests drive that path without real parameter changes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainHasher;

impl PlainHasher {
    /// The hash this hasher would produce for a plaintext.
    pub fn hash_of(password: &str) -> String {
        format!("plain${password}")
    }

    /// A hash that verifies successfully but reports stale parameters.
    pub fn stale_hash_of(password: &str) -> String {
        format!("stale${password}")
    }
}

impl CredentialHasher for PlainHasher {
    fn hash(&self, plain: &str) -> AppResult<String> {
        Ok(Self::hash_of(plain))
    }

    fn verify(&self, hash: &str, plain: &str) -> AppResult<VerifyOutcome> {
        match hash.split_once('$') {
            Some(("plain", stored)) if stored == plain => Ok(VerifyOutcome::Valid),
            Some(("stale", stored)) if stored == plain => Ok(VerifyOutcome::ValidNeedsRehash),
            _ => Ok(VerifyOutcome::Invalid),
        }
    }
}
