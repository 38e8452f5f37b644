//! SQLite persistence: schema definitions and the database handle.

pub mod database;
pub mod schema;

pub use database::Database;
