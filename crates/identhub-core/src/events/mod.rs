//! Security events emitted by IdentHub operations.
//!
//! Events are written to the pluggable audit sink. Every policy denial and
//! every credential/token/session state transition produces exactly one
//! event; internal denial reasons live here and never in user-facing
//! error messages.

pub mod security;

pub use security::{DenialReason, PolicyCode, RevocationReason, SecurityEvent};
