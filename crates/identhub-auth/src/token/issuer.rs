//! Token-pair issuance from a validated claim set.

use std::sync::Arc;

use identhub_core::AppResult;
use identhub_entity::token::{ClaimSet, TokenPair};

use super::signer::TokenSigner;

/// Issues access/refresh token pairs.
///
/// Pure over the signer: no persistence and no side effects. Storing the
/// refresh-token hash is the caller's responsibility.
#[derive(Clone)]
pub struct TokenIssuer {
    signer: Arc<dyn TokenSigner>,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer").finish()
    }
}

impl TokenIssuer {
    pub fn new(signer: Arc<dyn TokenSigner>) -> Self {
        Self { signer }
    }

    /// Signs an access token for the claim set and pairs it with a fresh
    /// opaque refresh token.
    pub fn issue(&self, claims: &ClaimSet) -> AppResult<TokenPair> {
        let access = self.signer.sign(claims)?;
        let refresh = self.signer.new_opaque_token();
        Ok(TokenPair::new(access, refresh))
    }
}
