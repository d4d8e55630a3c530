//! # identhub-auth
//!
//! Credential, token, and session lifecycle core for the IdentHub platform.
//!
//! ## Modules
//!
//! - `credentials` — login and refresh-token credential validation
//! - `token` — access-token signing, token-pair issuance, and single-use refresh rotation
//! - `session` — per-device session tracking, fingerprinting, and expired-session cleanup
//! - `password` — Argon2id hashing, strength checks, and expiry/history policy
//! - `roles` — cached direct + group role resolution for claim building
//! - `audit` — tracing-backed audit sink

pub mod audit;
pub mod credentials;
pub mod password;
pub mod roles;
pub mod session;
pub mod token;

pub use audit::LogAuditSink;
pub use credentials::CredentialValidator;
pub use password::{Argon2Hasher, PasswordPolicy, PasswordStrength};
pub use roles::RoleResolver;
pub use session::{ClientFingerprint, SessionCleanup, SessionRegistry};
pub use token::{JwtSigner, TokenIssuer, TokenRotator, TokenSigner};
