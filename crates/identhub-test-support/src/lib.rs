//! Shared test doubles and fixtures for the IdentHub workspace.

pub mod audit;
pub mod fixtures;
pub mod hashing;
pub mod memory;

pub use audit::RecordingAuditSink;
pub use hashing::PlainHasher;
pub use memory::MemoryStores;
