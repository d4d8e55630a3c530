pub mod connection;
pub mod migration;
pub mod repositories;
pub mod stores;

pub use connection::DatabasePool;
