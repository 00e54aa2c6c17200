//! Concrete [`DbExecutor`](crate::executor::DbExecutor) implementations.
//!
//! - `sqlite` - SQLite via `rusqlite` (enabled by the default `sqlite` feature)

#[cfg(feature = "sqlite")]
pub mod sqlite;
