//! SQLite persistence for the coordination engine: one `SqliteStore` that
//! implements every store trait from `scrum_core::store` against a single
//! connection pool, migrated via `sqlx::migrate!`.

pub mod common;
pub mod sqlite;

pub use sqlite::SqliteStore;
