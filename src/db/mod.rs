//! Database module
//!
//! SQLite persistence for compounds, stock movements, weighing records and labels.

pub mod connection;
pub mod migrations;

pub use connection::{Database, DbError, DbResult};
