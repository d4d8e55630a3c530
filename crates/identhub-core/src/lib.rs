//! # identhub-core
//!
//! Core crate for IdentHub. Contains the unified error system, configuration
//! schemas, the explicit request context, security/audit events, pagination
//! types, and the pluggable-capability traits implemented by other crates.
//!
//! This crate has **no** internal dependencies on other IdentHub crates.

pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;
pub mod types;

pub use context::RequestContext;
pub use error::AppError;
pub use result::AppResult;
