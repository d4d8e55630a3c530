//! # identhub-entity
//!
//! Domain entity models for IdentHub. Every struct in this crate represents
//! a database table row or a domain value object. All entities derive
//! `Debug`, `Clone`, `Serialize`, `Deserialize`, and database entities
//! additionally derive `sqlx::FromRow`. Secret-bearing columns
//! (password/refresh-token hashes) are never serialized.

pub mod password_history;
pub mod session;
pub mod tenant;
pub mod token;
pub mod user;
