//! Session management surface.

pub mod service;

pub use service::SessionService;
