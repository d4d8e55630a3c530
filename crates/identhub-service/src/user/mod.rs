//! User directory operations.

pub mod directory;

pub use directory::{RegisterUser, UserDirectory};
