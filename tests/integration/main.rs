//! End-to-end tests for the identity stack, wired over in-memory stores.

mod helpers;

mod auth_test;
mod directory_test;
mod session_test;
mod token_test;
