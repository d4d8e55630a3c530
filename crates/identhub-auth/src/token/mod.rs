//! Access-token signing, token-pair issuance, and refresh rotation.

pub mod issuer;
pub mod rotator;
pub mod signer;

pub use issuer::TokenIssuer;
pub use rotator::TokenRotator;
pub use signer::{JwtSigner, TokenSigner};

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use rand::Rng;
use sha2::{Digest, Sha256};

/// Hashes a refresh token for storage.
///
/// One-way; only the hash is ever persisted, so a database leak does not
/// expose usable refresh tokens.
pub fn hash_refresh_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    STANDARD.encode(digest)
}

/// Generates a random opaque refresh token string (256 bits, URL-safe).
pub fn generate_opaque_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
