//! Lazy, chainable querysets.
//!
//! A [`QuerySet`] builds up a [`Query`] AST through method chaining without
//! touching the database. It only executes when one of the async terminal
//! methods (`fetch`, `count`, `fetch_models`) is called with a
//! [`DbExecutor`].
//!
//! # Examples
//!
//! ```
//! use django_filter_db::query::{DatabaseBackendType, Lookup, OrderBy, QuerySet, Q};
//! use django_filter_db::value::Value;
//!
//! let qs = QuerySet::new("books")
//!     .filter(Q::filter("price", Lookup::Lt(Value::from(20))))
//!     .order_by(vec![OrderBy::parse("-published")]);
//!
//! let (sql, params) = qs.to_sql(DatabaseBackendType::PostgreSQL);
//! assert_eq!(
//!     sql,
//!     "SELECT * FROM \"books\" WHERE \"price\" < $1 ORDER BY \"published\" DESC"
//! );
//! assert_eq!(params, vec![Value::Int(20)]);
//! ```

use django_filter_core::FilterResult;

use super::compiler::{DatabaseBackendType, OrderBy, Query, Row, SqlCompiler, WhereNode};
use super::lookups::Q;
use crate::executor::DbExecutor;
use crate::model::Model;
use crate::value::Value;

/// A lazy database query over one table.
///
/// Every chaining method consumes the queryset and returns the modified
/// version; clone a queryset to branch it.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySet {
    query: Query,
    /// Whether this queryset should return no results.
    is_none: bool,
}

impl QuerySet {
    /// Creates a queryset over every row of `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            query: Query::new(table),
            is_none: false,
        }
    }

    /// Creates a queryset over a model's table with its default ordering.
    pub fn for_model<M: Model>() -> Self {
        Self::new(M::table_name()).order_by(M::meta().ordering.clone())
    }

    /// Returns a reference to the underlying query AST.
    pub const fn query(&self) -> &Query {
        &self.query
    }

    /// Returns the table this queryset reads.
    pub fn table(&self) -> &str {
        &self.query.table
    }

    /// Returns `true` if [`none`](Self::none) was applied.
    pub const fn is_none(&self) -> bool {
        self.is_none
    }

    // ── Filtering methods (lazy) ─────────────────────────────────────

    /// Adds a filter condition. An empty AND leaves the queryset unchanged.
    #[must_use]
    pub fn filter(mut self, q: Q) -> Self {
        if is_noop(&q) {
            return self;
        }
        self.query.add_where(WhereNode::from_q(&q));
        self
    }

    /// Adds an exclusion condition (NOT). An empty AND leaves the queryset
    /// unchanged.
    #[must_use]
    pub fn exclude(mut self, q: Q) -> Self {
        if is_noop(&q) {
            return self;
        }
        self.query
            .add_where(WhereNode::Not(Box::new(WhereNode::from_q(&q))));
        self
    }

    /// Replaces the ordering.
    #[must_use]
    pub fn order_by(mut self, fields: Vec<OrderBy>) -> Self {
        self.query.order_by = fields;
        self
    }

    /// Selects specific columns instead of `*`.
    #[must_use]
    pub fn values(mut self, fields: &[&str]) -> Self {
        self.query.select = fields.iter().map(|f| (*f).to_string()).collect();
        self
    }

    /// Adds DISTINCT to the query.
    #[must_use]
    pub fn distinct(mut self) -> Self {
        self.query.distinct = true;
        self
    }

    /// Returns the queryset unchanged (identity operation for chaining).
    #[must_use]
    pub fn all(self) -> Self {
        self
    }

    /// Returns a queryset that matches nothing.
    #[must_use]
    pub fn none(mut self) -> Self {
        self.is_none = true;
        self
    }

    /// Sets the LIMIT.
    #[must_use]
    pub fn limit(mut self, n: usize) -> Self {
        self.query.limit = Some(n);
        self
    }

    /// Sets the OFFSET.
    #[must_use]
    pub fn offset(mut self, n: usize) -> Self {
        self.query.offset = Some(n);
        self
    }

    // ── Compilation ──────────────────────────────────────────────────

    fn effective_query(&self) -> Query {
        let mut query = self.query.clone();
        if self.is_none {
            query.add_where(WhereNode::never());
        }
        query
    }

    /// Compiles the SELECT for this queryset.
    pub fn to_sql(&self, backend: DatabaseBackendType) -> (String, Vec<Value>) {
        SqlCompiler::new(backend).compile_select(&self.effective_query())
    }

    /// Compiles a COUNT for this queryset.
    pub fn count_sql(&self, backend: DatabaseBackendType) -> (String, Vec<Value>) {
        SqlCompiler::new(backend).compile_count(&self.effective_query())
    }

    // ── Execution ────────────────────────────────────────────────────

    /// Runs the query and returns the raw rows.
    pub async fn fetch(&self, db: &dyn DbExecutor) -> FilterResult<Vec<Row>> {
        if self.is_none {
            return Ok(Vec::new());
        }
        let (sql, params) = self.to_sql(db.backend_type());
        tracing::trace!(%sql, params = params.len(), "fetch");
        db.query(&sql, &params).await
    }

    /// Returns the number of matching rows.
    pub async fn count(&self, db: &dyn DbExecutor) -> FilterResult<i64> {
        if self.is_none {
            return Ok(0);
        }
        let (sql, params) = self.count_sql(db.backend_type());
        tracing::trace!(%sql, params = params.len(), "count");
        let rows = db.query(&sql, &params).await?;
        rows.into_iter()
            .next()
            .map_or(Ok(0), |row| row.get_by_index::<i64>(0))
    }

    /// Runs the query and builds a model instance from every row.
    pub async fn fetch_models<M: Model>(&self, db: &dyn DbExecutor) -> FilterResult<Vec<M>> {
        let rows = self.fetch(db).await?;
        rows.iter().map(M::from_row).collect()
    }
}

fn is_noop(q: &Q) -> bool {
    matches!(q, Q::And(children) if children.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::lookups::{Lookup, LookupType};

    fn sqlite() -> DatabaseBackendType {
        DatabaseBackendType::SQLite
    }

    #[test]
    fn test_new_selects_everything() {
        let qs = QuerySet::new("books");
        assert_eq!(qs.table(), "books");
        assert!(!qs.is_none());
        assert_eq!(qs.to_sql(sqlite()).0, "SELECT * FROM \"books\"");
    }

    #[test]
    fn test_filters_chain_with_and() {
        let qs = QuerySet::new("books")
            .filter(Q::filter("price", Lookup::Gte(Value::Int(5))))
            .filter(Q::filter("price", Lookup::Lte(Value::Int(9))))
            .exclude(Q::filter("title", Lookup::IsNull(true)));
        let (sql, params) = qs.to_sql(DatabaseBackendType::PostgreSQL);
        assert_eq!(
            sql,
            "SELECT * FROM \"books\" WHERE (\"price\" >= $1 AND \"price\" <= $2 AND NOT (\"title\" IS NULL))"
        );
        assert_eq!(params, vec![Value::Int(5), Value::Int(9)]);
    }

    #[test]
    fn test_empty_q_is_noop() {
        let qs = QuerySet::new("books").filter(Q::And(vec![])).exclude(Q::And(vec![]));
        assert_eq!(qs, QuerySet::new("books"));
    }

    #[test]
    fn test_empty_or_matches_nothing() {
        let (sql, _) = QuerySet::new("books").filter(Q::Or(vec![])).to_sql(sqlite());
        assert_eq!(sql, "SELECT * FROM \"books\" WHERE 1=0");
    }

    #[test]
    fn test_none_compiles_to_false_predicate() {
        let qs = QuerySet::new("books").none();
        assert!(qs.is_none());
        assert_eq!(qs.to_sql(sqlite()).0, "SELECT * FROM \"books\" WHERE 1=0");

        let qs = QuerySet::new("books")
            .filter(Q::filter("price", Lookup::Gt(Value::Int(1))))
            .none();
        assert_eq!(
            qs.to_sql(sqlite()).0,
            "SELECT * FROM \"books\" WHERE (\"price\" > ? AND 1=0)"
        );
    }

    #[test]
    fn test_order_distinct_slice() {
        let qs = QuerySet::new("books")
            .values(&["title"])
            .distinct()
            .order_by(vec![OrderBy::parse("-title")])
            .limit(3)
            .offset(1)
            .all();
        assert_eq!(
            qs.to_sql(sqlite()).0,
            "SELECT DISTINCT \"title\" FROM \"books\" ORDER BY \"title\" DESC LIMIT 3 OFFSET 1"
        );
    }

    #[test]
    fn test_count_sql() {
        let qs = QuerySet::new("books")
            .filter(Q::lookup("published", LookupType::Year, Value::Int(2020)).unwrap())
            .order_by(vec![OrderBy::asc("title")]);
        assert_eq!(
            qs.count_sql(sqlite()).0,
            "SELECT COUNT(*) AS \"__count\" FROM \"books\" WHERE CAST(strftime('%Y', \"published\") AS INTEGER) = ?"
        );
    }

    #[test]
    fn test_clone_branches_independently() {
        let base = QuerySet::new("books");
        let narrowed = base.clone().filter(Q::filter("id", Lookup::Exact(Value::Int(1))));
        assert!(base.query().where_clause.is_none());
        assert!(narrowed.query().where_clause.is_some());
    }
}
