//! Login, logout, and activity flows.

pub mod service;

pub use service::{AuthService, LoginOutcome};
