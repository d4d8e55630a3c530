//! Login and refresh-token credential validation.

pub mod validator;

pub use validator::CredentialValidator;
