//! MongoDB-backed data-access layer for users, user groups and access
//! records, built around a self-healing connection lifecycle manager.
//!
//! [`MongoConnection`] owns the single shared handle and runs a background
//! monitor that dials, probes and tears down the connection. [`MongoDb`]
//! layers generic CRUD helpers on top of it, and the [`store`] module
//! exposes the per-entity stores.

pub mod connection;
pub mod database;
pub mod error;
pub mod store;
pub mod utils;

pub use connection::{ConnectionConfig, MongoConnection};
pub use database::MongoDb;
pub use error::DatabaseError;
pub use store::StoreError;
