//! SQLite storage layer.

pub mod db;

// Re-exports for convenience
pub use db::{DbConnection, DbPool};
