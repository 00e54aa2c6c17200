//! Database executor trait.
//!
//! [`DbExecutor`] is the minimal async interface the queryset execution
//! methods need. Backends (see [`crate::backends`]) implement it; filter sets
//! accept `&dyn DbExecutor` so they never depend on a concrete database.

use django_filter_core::FilterResult;

use crate::query::compiler::{DatabaseBackendType, Row};
use crate::value::Value;

/// Minimal async database executor trait.
#[async_trait::async_trait]
pub trait DbExecutor: Send + Sync {
    /// Returns the backend type for SQL compilation.
    fn backend_type(&self) -> DatabaseBackendType;

    /// Runs a SQL statement that does not return rows.
    /// Returns the number of rows affected.
    async fn execute_sql(&self, sql: &str, params: &[Value]) -> FilterResult<u64>;

    /// Runs a SQL query and returns all result rows.
    async fn query(&self, sql: &str, params: &[Value]) -> FilterResult<Vec<Row>>;
}
