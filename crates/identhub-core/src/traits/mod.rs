//! Core traits defined in `identhub-core` and implemented by other crates.

pub mod audit;
pub mod hasher;

pub use audit::AuditSink;
pub use hasher::{CredentialHasher, VerifyOutcome};
