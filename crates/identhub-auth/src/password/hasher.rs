//! Argon2id password hashing and verification.

use argon2::{
    Argon2, Params,
    password_hash::{
        PasswordHash, PasswordHasher as ArgonHasher, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};

use identhub_core::error::AppError;
use identhub_core::traits::{CredentialHasher, VerifyOutcome};
use identhub_core::AppResult;

/// Argon2id implementation of [`CredentialHasher`].
///
/// Verification reports when a matching hash was produced under parameters
/// other than the current defaults, so callers can transparently re-hash
/// while the plaintext is in hand.
#[derive(Debug, Clone, Default)]
pub struct Argon2Hasher;

impl Argon2Hasher {
    pub fn new() -> Self {
        Self
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, plain: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        let hash = argon2
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| AppError::internal(format!("Password hashing failed: {e}")))?;

        Ok(hash.to_string())
    }

    fn verify(&self, hash: &str, plain: &str) -> AppResult<VerifyOutcome> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| AppError::internal(format!("Invalid password hash format: {e}")))?;

        let argon2 = Argon2::default();
        match argon2.verify_password(plain.as_bytes(), &parsed) {
            Ok(()) => {
                if needs_rehash(&parsed) {
                    Ok(VerifyOutcome::ValidNeedsRehash)
                } else {
                    Ok(VerifyOutcome::Valid)
                }
            }
            Err(argon2::password_hash::Error::Password) => Ok(VerifyOutcome::Invalid),
            Err(e) => Err(AppError::internal(format!(
                "Password verification failed: {e}"
            ))),
        }
    }
}

/// A hash needs re-hashing when it was produced by a different algorithm
/// variant or under cost parameters that differ from the current defaults.
fn needs_rehash(parsed: &PasswordHash<'_>) -> bool {
    if parsed.algorithm != argon2::ARGON2ID_IDENT {
        return true;
    }
    let Ok(params) = Params::try_from(parsed) else {
        return true;
    };
    let current = Params::default();
    params.m_cost() != current.m_cost()
        || params.t_cost() != current.t_cost()
        || params.p_cost() != current.p_cost()
}
