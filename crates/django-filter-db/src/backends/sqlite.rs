//! SQLite database backend using `rusqlite`.
//!
//! [`SqliteBackend`] implements [`DbExecutor`] by running every statement
//! inside `tokio::task::spawn_blocking` against a connection guarded by an
//! async mutex.
//!
//! - In-memory databases via `:memory:` (used throughout the tests)
//! - WAL mode for file-based databases
//! - A `REGEXP` function backed by the `regex` crate, so the `regex` and
//!   `iregex` lookups work on SQLite

use std::path::PathBuf;
use std::sync::Arc;

use django_filter_core::{FilterError, FilterResult};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::ValueRef;
use tokio::sync::Mutex;

use crate::executor::DbExecutor;
use crate::query::compiler::{DatabaseBackendType, Row};
use crate::value::Value;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A SQLite database backend.
pub struct SqliteBackend {
    /// The path to the database file (or ":memory:").
    path: PathBuf,
    /// The connection, guarded by an async mutex.
    conn: Arc<Mutex<rusqlite::Connection>>,
}

impl SqliteBackend {
    /// Opens a SQLite database at the given path.
    ///
    /// If the path is `:memory:`, an in-memory database is created.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or configured.
    pub fn open(path: impl Into<PathBuf>) -> FilterResult<Self> {
        let path = path.into();
        let in_memory = path.to_str() == Some(":memory:");
        let conn = if in_memory {
            rusqlite::Connection::open_in_memory()
        } else {
            rusqlite::Connection::open(&path)
        }
        .map_err(|e| FilterError::OperationalError(format!("SQLite open failed: {e}")))?;

        if !in_memory {
            conn.execute_batch("PRAGMA journal_mode=WAL;")
                .map_err(|e| FilterError::OperationalError(format!("Failed to set pragmas: {e}")))?;
        }
        register_regexp(&conn)?;

        tracing::debug!(path = %path.display(), "opened sqlite database");
        Ok(Self {
            path,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens an in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created.
    pub fn memory() -> FilterResult<Self> {
        Self::open(":memory:")
    }

    /// Returns the database file path.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Runs a batch of semicolon-separated statements without parameters
    /// (schema setup, fixtures).
    pub async fn execute_batch(&self, sql: &str) -> FilterResult<()> {
        let conn = self.conn.clone();
        let sql = sql.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.execute_batch(&sql)
                .map_err(|e| FilterError::DatabaseError(e.to_string()))
        })
        .await
        .map_err(|e| FilterError::DatabaseError(format!("Task join error: {e}")))?
    }

    /// Binds `Value`s to a prepared statement.
    fn bind_params(stmt: &mut rusqlite::Statement<'_>, params: &[Value]) -> FilterResult<()> {
        for (i, param) in params.iter().enumerate() {
            let idx = i + 1;
            match param {
                Value::Null => stmt.raw_bind_parameter(idx, rusqlite::types::Null),
                Value::Bool(b) => stmt.raw_bind_parameter(idx, b),
                Value::Int(v) => stmt.raw_bind_parameter(idx, v),
                Value::Float(v) => stmt.raw_bind_parameter(idx, v),
                Value::String(s) => stmt.raw_bind_parameter(idx, s.as_str()),
                Value::Date(d) => stmt.raw_bind_parameter(idx, d.to_string()),
                Value::DateTime(dt) => {
                    stmt.raw_bind_parameter(idx, dt.format("%Y-%m-%d %H:%M:%S%.f").to_string())
                }
                Value::Time(t) => stmt.raw_bind_parameter(idx, t.to_string()),
                Value::Uuid(u) => stmt.raw_bind_parameter(idx, u.to_string()),
                Value::List(_) => {
                    return Err(FilterError::DatabaseError(format!(
                        "Cannot bind a list to parameter {idx}"
                    )));
                }
            }
            .map_err(|e| FilterError::DatabaseError(format!("Bind error: {e}")))?;
        }
        Ok(())
    }

    /// Converts a `rusqlite::Row` to a [`Row`].
    fn convert_row(sqlite_row: &rusqlite::Row<'_>, column_names: &[String]) -> FilterResult<Row> {
        let mut values = Vec::with_capacity(column_names.len());
        for i in 0..column_names.len() {
            let value = match sqlite_row
                .get_ref(i)
                .map_err(|e| FilterError::DatabaseError(e.to_string()))?
            {
                ValueRef::Null => Value::Null,
                ValueRef::Integer(v) => Value::Int(v),
                ValueRef::Real(v) => Value::Float(v),
                ValueRef::Text(b) | ValueRef::Blob(b) => {
                    Value::String(String::from_utf8_lossy(b).into_owned())
                }
            };
            values.push(value);
        }
        Ok(Row::new(column_names.to_vec(), values))
    }
}

/// Registers `regexp(pattern, text)`, which SQLite calls for `text REGEXP pattern`.
fn register_regexp(conn: &rusqlite::Connection) -> FilterResult<()> {
    conn.create_scalar_function(
        "regexp",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let re: Arc<regex::Regex> = ctx.get_or_create_aux(0, |vr| -> Result<_, BoxError> {
                Ok(regex::Regex::new(vr.as_str()?)?)
            })?;
            let matched = match ctx.get_raw(1) {
                ValueRef::Null => false,
                ValueRef::Text(b) => re.is_match(&String::from_utf8_lossy(b)),
                ValueRef::Integer(i) => re.is_match(&i.to_string()),
                ValueRef::Real(f) => re.is_match(&f.to_string()),
                ValueRef::Blob(_) => false,
            };
            Ok(matched)
        },
    )
    .map_err(|e| FilterError::OperationalError(format!("Failed to register REGEXP: {e}")))
}

#[async_trait::async_trait]
impl DbExecutor for SqliteBackend {
    fn backend_type(&self) -> DatabaseBackendType {
        DatabaseBackendType::SQLite
    }

    async fn execute_sql(&self, sql: &str, params: &[Value]) -> FilterResult<u64> {
        let conn = self.conn.clone();
        let sql = sql.to_string();
        let params = params.to_vec();

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| FilterError::DatabaseError(e.to_string()))?;
            Self::bind_params(&mut stmt, &params)?;
            let count = stmt
                .raw_execute()
                .map_err(|e| FilterError::DatabaseError(e.to_string()))?;
            Ok(count as u64)
        })
        .await
        .map_err(|e| FilterError::DatabaseError(format!("Task join error: {e}")))?
    }

    async fn query(&self, sql: &str, params: &[Value]) -> FilterResult<Vec<Row>> {
        let conn = self.conn.clone();
        let sql = sql.to_string();
        let params = params.to_vec();

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| FilterError::DatabaseError(e.to_string()))?;

            let column_names: Vec<String> =
                stmt.column_names().into_iter().map(String::from).collect();

            Self::bind_params(&mut stmt, &params)?;

            let mut raw_rows = stmt.raw_query();
            let mut rows = Vec::new();
            while let Some(row) = raw_rows
                .next()
                .map_err(|e| FilterError::DatabaseError(e.to_string()))?
            {
                rows.push(Self::convert_row(row, &column_names)?);
            }
            Ok(rows)
        })
        .await
        .map_err(|e| FilterError::DatabaseError(format!("Task join error: {e}")))?
    }
}
