//! Database module: models and schema for persistent storage.
//!
//! Layout:
//! - `models.rs`: raw rows and their conversion to `ConnectionProfile`
//! - `schema.rs`: SQL DDL for initializing the database (SQLite-first)
//! - `sqlite.rs`: transactional row access

pub mod models;
pub mod schema;
pub mod sqlite;

pub use models::DbProfile;
pub use schema::SQLITE_INIT;
pub use sqlite::{ProfilesStorage, SqlitePool};
