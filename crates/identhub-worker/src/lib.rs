//! # identhub-worker
//!
//! Background maintenance for IdentHub. Currently a single task: the
//! session janitor, which periodically purges session rows that expired
//! longer ago than the retention window.

pub mod janitor;

pub use janitor::SessionJanitor;
