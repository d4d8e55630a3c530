//! JWT access-token signing and opaque refresh-token generation.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use identhub_core::config::TokenConfig;
use identhub_core::error::AppError;
use identhub_core::AppResult;
use identhub_entity::token::{ClaimSet, OpaqueToken, SignedToken};

use super::generate_opaque_token;

/// Produces signed access tokens and random opaque refresh tokens.
///
/// The token wire format is owned entirely by the signer; everything above
/// it deals only in [`ClaimSet`]s and opaque strings.
pub trait TokenSigner: Send + Sync + 'static {
    /// Signs an access token embedding the claim set.
    fn sign(&self, claims: &ClaimSet) -> AppResult<SignedToken>;

    /// Decodes and fully validates an access token.
    fn decode(&self, token: &str) -> AppResult<ClaimSet>;

    /// Extracts the subject of an access token without checking the
    /// signature or expiry.
    ///
    /// Used to pair an access token with a refresh token during rotation,
    /// where the access token is usually already expired. The result must
    /// never be used for authentication on its own.
    fn peek_subject(&self, token: &str) -> AppResult<Uuid>;

    /// Generates a new random refresh token with its expiry.
    fn new_opaque_token(&self) -> OpaqueToken;
}

/// On-the-wire JWT payload: the claim set plus registered time claims.
#[derive(Debug, Serialize, Deserialize)]
struct WireClaims {
    #[serde(flatten)]
    claims: ClaimSet,
    iat: i64,
    exp: i64,
}

/// HS256 implementation of [`TokenSigner`].
#[derive(Clone)]
pub struct JwtSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl std::fmt::Debug for JwtSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSigner")
            .field("validation", &self.validation)
            .finish()
    }
}

impl JwtSigner {
    /// Creates a new signer from token configuration.
    pub fn new(config: &TokenConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 5; // 5 seconds leeway for clock skew

        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            access_ttl: Duration::minutes(config.access_token_ttl_minutes as i64),
            refresh_ttl: Duration::days(config.refresh_token_ttl_days as i64),
        }
    }
}

impl TokenSigner for JwtSigner {
    fn sign(&self, claims: &ClaimSet) -> AppResult<SignedToken> {
        let now = Utc::now();
        let expires_at = now + self.access_ttl;

        let wire = WireClaims {
            claims: claims.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::default(), &wire, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to encode access token: {e}")))?;

        Ok(SignedToken { token, expires_at })
    }

    fn decode(&self, token: &str) -> AppResult<ClaimSet> {
        let data = decode::<WireClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AppError::unauthorized("Token has expired")
                }
                jsonwebtoken::errors::ErrorKind::InvalidToken => {
                    AppError::unauthorized("Invalid token format")
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    AppError::unauthorized("Invalid token signature")
                }
                _ => AppError::unauthorized(format!("Token validation failed: {e}")),
            },
        )?;

        Ok(data.claims.claims)
    }

    fn peek_subject(&self, token: &str) -> AppResult<Uuid> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;

        let data = decode::<WireClaims>(token, &self.decoding_key, &validation)
            .map_err(|_| AppError::unauthorized("Invalid token format"))?;

        Ok(data.claims.claims.sub)
    }

    fn new_opaque_token(&self) -> OpaqueToken {
        OpaqueToken {
            token: generate_opaque_token(),
            expires_at: Utc::now() + self.refresh_ttl,
        }
    }
}
