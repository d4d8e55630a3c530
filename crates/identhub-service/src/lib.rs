//! # identhub-service
//!
//! Caller-facing orchestration for IdentHub. The focused lifecycle
//! components live in `identhub-auth`; this crate composes them into the
//! flows an inbound surface calls, and adds the caller-authorization rules
//! that need a [`identhub_core::context::RequestContext`].
//!
//! Services follow constructor injection — all dependencies are provided
//! at construction time via `Arc` references.

pub mod auth;
pub mod session;
pub mod user;

pub use auth::{AuthService, LoginOutcome};
pub use session::SessionService;
pub use user::{RegisterUser, UserDirectory};
