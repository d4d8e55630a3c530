//! Per-device session tracking: creation, validation, activity, cleanup.

pub mod cleanup;
pub mod fingerprint;
pub mod registry;

pub use cleanup::SessionCleanup;
pub use fingerprint::ClientFingerprint;
pub use registry::SessionRegistry;
