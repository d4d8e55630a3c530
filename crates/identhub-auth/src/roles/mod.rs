//! Role resolution for claim building.

pub mod resolver;

pub use resolver::RoleResolver;
