//! SQL query AST and compiler.
//!
//! This module defines the [`Query`] AST that a queryset builds up, and the
//! [`SqlCompiler`] that translates it into parameterized SQL. The compiler
//! supports PostgreSQL (`$1, $2, ...`) and SQLite/MySQL (`?`) placeholder
//! styles, and renders the date-part lookups with each backend's own date
//! functions.

use django_filter_core::FilterError;

use super::lookups::{Lookup, Q};
use crate::value::Value;

/// The type of database backend, used by the compiler to generate
/// backend-specific SQL syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackendType {
    /// PostgreSQL (uses `$1, $2, ...` placeholders).
    PostgreSQL,
    /// SQLite (uses `?` placeholders).
    SQLite,
    /// MySQL (uses `?` placeholders).
    MySQL,
}

/// A column ordering direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// The column to order by.
    pub column: String,
    /// Whether to sort in descending order.
    pub descending: bool,
}

impl OrderBy {
    /// Creates an ascending order.
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: false,
        }
    }

    /// Creates a descending order.
    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: true,
        }
    }

    /// Parses `"field"` (ascending) or `"-field"` (descending).
    ///
    /// ```
    /// use django_filter_db::query::OrderBy;
    ///
    /// assert_eq!(OrderBy::parse("-price"), OrderBy::desc("price"));
    /// assert_eq!(OrderBy::parse("title"), OrderBy::asc("title"));
    /// ```
    pub fn parse(spec: &str) -> Self {
        spec.strip_prefix('-')
            .map_or_else(|| Self::asc(spec), Self::desc)
    }
}

/// A WHERE clause node in the query AST.
#[derive(Debug, Clone, PartialEq)]
pub enum WhereNode {
    /// A single condition.
    Condition {
        /// The column name.
        column: String,
        /// The lookup to apply.
        lookup: Lookup,
    },
    /// Logical AND of conditions.
    And(Vec<WhereNode>),
    /// Logical OR of conditions.
    Or(Vec<WhereNode>),
    /// Logical NOT of a condition.
    Not(Box<WhereNode>),
}

impl WhereNode {
    /// Converts a `Q` object into a `WhereNode`.
    pub fn from_q(q: &Q) -> Self {
        match q {
            Q::Filter { field, lookup } => Self::Condition {
                column: field.clone(),
                lookup: lookup.clone(),
            },
            Q::And(children) => Self::And(children.iter().map(Self::from_q).collect()),
            Q::Or(children) => Self::Or(children.iter().map(Self::from_q).collect()),
            Q::Not(inner) => Self::Not(Box::new(Self::from_q(inner))),
        }
    }

    /// A predicate that never matches.
    pub const fn never() -> Self {
        Self::Or(Vec::new())
    }
}

/// The query AST representing a SELECT statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// The main table name.
    pub table: String,
    /// Columns to select; empty means `*`.
    pub select: Vec<String>,
    /// WHERE clause.
    pub where_clause: Option<WhereNode>,
    /// ORDER BY clauses.
    pub order_by: Vec<OrderBy>,
    /// LIMIT.
    pub limit: Option<usize>,
    /// OFFSET.
    pub offset: Option<usize>,
    /// DISTINCT flag.
    pub distinct: bool,
}

impl Query {
    /// Creates a new query for the given table.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            select: Vec::new(),
            where_clause: None,
            order_by: Vec::new(),
            limit: None,
            offset: None,
            distinct: false,
        }
    }

    /// ANDs `node` onto the existing WHERE clause.
    pub fn add_where(&mut self, node: WhereNode) {
        self.where_clause = Some(match self.where_clause.take() {
            None => node,
            Some(WhereNode::And(mut children)) => {
                children.push(node);
                WhereNode::And(children)
            }
            Some(existing) => WhereNode::And(vec![existing, node]),
        });
    }
}

/// A generic database row for passing data between backends and callers.
///
/// `Row` holds a list of column names and their corresponding values. It
/// provides typed access via the [`get`](Row::get) method.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    /// Creates a new row from column names and values.
    ///
    /// # Panics
    ///
    /// Panics if the number of columns does not match the number of values.
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        assert_eq!(
            columns.len(),
            values.len(),
            "Row column count must match value count"
        );
        Self { columns, values }
    }

    /// Returns the column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Gets a typed value by column name.
    ///
    /// # Errors
    ///
    /// Returns an error if the column does not exist or the value cannot be
    /// converted to the requested type.
    pub fn get<T: FromValue>(&self, column: &str) -> Result<T, FilterError> {
        let value = self.get_value(column).ok_or_else(|| {
            FilterError::DatabaseError(format!("Column '{column}' not found in row"))
        })?;
        T::from_value(value)
    }

    /// Gets a typed value by column index.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is out of bounds or the value cannot be
    /// converted to the requested type.
    pub fn get_by_index<T: FromValue>(&self, idx: usize) -> Result<T, FilterError> {
        let value = self.values.get(idx).ok_or_else(|| {
            FilterError::DatabaseError(format!(
                "Column index {idx} out of bounds (row has {} columns)",
                self.values.len()
            ))
        })?;
        T::from_value(value)
    }

    /// Returns a reference to the raw Value at the given column name.
    pub fn get_value(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|idx| &self.values[idx])
    }
}

/// Trait for converting a [`Value`] to a concrete Rust type.
pub trait FromValue: Sized {
    /// Attempts to convert a value reference to this type.
    fn from_value(value: &Value) -> Result<Self, FilterError>;
}

fn mismatch(expected: &str, value: &Value) -> FilterError {
    FilterError::DatabaseError(format!("Expected {expected}, got {value:?}"))
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self, FilterError> {
        match value {
            Value::Int(i) => Ok(*i),
            _ => Err(mismatch("Int", value)),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Result<Self, FilterError> {
        match value {
            Value::Int(i) => Self::try_from(*i).map_err(|e| {
                FilterError::DatabaseError(format!("Int value out of i32 range: {e}"))
            }),
            _ => Err(mismatch("Int", value)),
        }
    }
}

impl FromValue for f64 {
    #[allow(clippy::cast_precision_loss)]
    fn from_value(value: &Value) -> Result<Self, FilterError> {
        match value {
            Value::Float(f) => Ok(*f),
            Value::Int(i) => Ok(*i as Self),
            _ => Err(mismatch("Float", value)),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, FilterError> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::Int(0) => Ok(false),
            Value::Int(1) => Ok(true),
            _ => Err(mismatch("Bool", value)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, FilterError> {
        match value {
            Value::String(s) => Ok(s.clone()),
            _ => Err(mismatch("String", value)),
        }
    }
}

impl FromValue for chrono::NaiveDate {
    fn from_value(value: &Value) -> Result<Self, FilterError> {
        match value {
            Value::Date(d) => Ok(*d),
            Value::String(s) => Self::parse_from_str(s, "%Y-%m-%d")
                .map_err(|e| FilterError::DatabaseError(format!("Invalid date '{s}': {e}"))),
            _ => Err(mismatch("Date", value)),
        }
    }
}

impl FromValue for chrono::NaiveDateTime {
    fn from_value(value: &Value) -> Result<Self, FilterError> {
        match value {
            Value::DateTime(dt) => Ok(*dt),
            Value::String(s) => Self::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
                .or_else(|_| Self::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
                .map_err(|e| FilterError::DatabaseError(format!("Invalid datetime '{s}': {e}"))),
            _ => Err(mismatch("DateTime", value)),
        }
    }
}

impl FromValue for uuid::Uuid {
    fn from_value(value: &Value) -> Result<Self, FilterError> {
        match value {
            Value::Uuid(u) => Ok(*u),
            Value::String(s) => s
                .parse()
                .map_err(|e| FilterError::DatabaseError(format!("Invalid uuid '{s}': {e}"))),
            _ => Err(mismatch("Uuid", value)),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self, FilterError> {
        Ok(value.clone())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, FilterError> {
        match value {
            Value::Null => Ok(None),
            _ => T::from_value(value).map(Some),
        }
    }
}

/// Quotes an identifier, doubling embedded quotes.
fn quote_name(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// The SQL compiler translates a [`Query`] AST into parameterized SQL.
///
/// Different backends use different placeholder styles:
/// - PostgreSQL: `$1, $2, $3, ...`
/// - SQLite / MySQL: `?, ?, ?, ...`
pub struct SqlCompiler {
    backend: DatabaseBackendType,
}

impl SqlCompiler {
    /// Creates a new compiler for the given backend type.
    pub const fn new(backend: DatabaseBackendType) -> Self {
        Self { backend }
    }

    /// Pushes a parameter and returns its placeholder.
    fn bind(&self, params: &mut Vec<Value>, value: Value) -> String {
        params.push(value);
        match self.backend {
            DatabaseBackendType::PostgreSQL => format!("${}", params.len()),
            DatabaseBackendType::SQLite | DatabaseBackendType::MySQL => "?".to_string(),
        }
    }

    /// Compiles a SELECT query into SQL and parameters.
    pub fn compile_select(&self, query: &Query) -> (String, Vec<Value>) {
        let mut params: Vec<Value> = Vec::new();
        let mut sql = String::from("SELECT ");

        if query.distinct {
            sql.push_str("DISTINCT ");
        }

        if query.select.is_empty() {
            sql.push('*');
        } else {
            let cols: Vec<String> = query.select.iter().map(|c| quote_name(c)).collect();
            sql.push_str(&cols.join(", "));
        }

        sql.push_str(&format!(" FROM {}", quote_name(&query.table)));

        if let Some(ref where_clause) = query.where_clause {
            sql.push_str(" WHERE ");
            self.compile_where_node(where_clause, &mut sql, &mut params);
        }

        if !query.order_by.is_empty() {
            let orders: Vec<String> = query
                .order_by
                .iter()
                .map(|o| {
                    let dir = if o.descending { " DESC" } else { " ASC" };
                    format!("{}{dir}", quote_name(&o.column))
                })
                .collect();
            sql.push_str(&format!(" ORDER BY {}", orders.join(", ")));
        }

        match (query.limit, query.offset) {
            (Some(limit), offset) => {
                sql.push_str(&format!(" LIMIT {limit}"));
                if let Some(offset) = offset {
                    sql.push_str(&format!(" OFFSET {offset}"));
                }
            }
            // SQLite and MySQL only accept OFFSET after a LIMIT.
            (None, Some(offset)) => match self.backend {
                DatabaseBackendType::PostgreSQL => sql.push_str(&format!(" OFFSET {offset}")),
                DatabaseBackendType::SQLite => sql.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
                DatabaseBackendType::MySQL => {
                    sql.push_str(&format!(" LIMIT 18446744073709551615 OFFSET {offset}"));
                }
            },
            (None, None) => {}
        }

        (sql, params)
    }

    /// Compiles a `SELECT COUNT(*)` for the rows `query` would return.
    ///
    /// Ordering is dropped. Distinct or sliced queries are counted through a
    /// subquery.
    pub fn compile_count(&self, query: &Query) -> (String, Vec<Value>) {
        let mut inner = query.clone();
        inner.order_by.clear();

        if inner.distinct || inner.limit.is_some() || inner.offset.is_some() {
            let (sub, params) = self.compile_select(&inner);
            return (
                format!("SELECT COUNT(*) AS \"__count\" FROM ({sub}) AS \"__sub\""),
                params,
            );
        }

        let mut params = Vec::new();
        let mut sql = format!("SELECT COUNT(*) AS \"__count\" FROM {}", quote_name(&inner.table));
        if let Some(ref where_clause) = inner.where_clause {
            sql.push_str(" WHERE ");
            self.compile_where_node(where_clause, &mut sql, &mut params);
        }
        (sql, params)
    }

    /// Compiles a `WhereNode` into SQL, appending to the provided string.
    fn compile_where_node(&self, node: &WhereNode, sql: &mut String, params: &mut Vec<Value>) {
        match node {
            WhereNode::Condition { column, lookup } => {
                self.compile_lookup(column, lookup, sql, params);
            }
            WhereNode::And(children) => {
                if children.is_empty() {
                    sql.push_str("1=1");
                    return;
                }
                self.compile_joined(children, " AND ", sql, params);
            }
            WhereNode::Or(children) => {
                if children.is_empty() {
                    sql.push_str("1=0");
                    return;
                }
                self.compile_joined(children, " OR ", sql, params);
            }
            WhereNode::Not(inner) => {
                sql.push_str("NOT (");
                self.compile_where_node(inner, sql, params);
                sql.push(')');
            }
        }
    }

    fn compile_joined(
        &self,
        children: &[WhereNode],
        connector: &str,
        sql: &mut String,
        params: &mut Vec<Value>,
    ) {
        sql.push('(');
        for (i, child) in children.iter().enumerate() {
            if i > 0 {
                sql.push_str(connector);
            }
            self.compile_where_node(child, sql, params);
        }
        sql.push(')');
    }

    /// Compiles a single lookup into SQL.
    fn compile_lookup(&self, column: &str, lookup: &Lookup, sql: &mut String, params: &mut Vec<Value>) {
        let col = quote_name(column);
        let fragment = match lookup {
            Lookup::Exact(val) | Lookup::IExact(val) if val.is_null() => format!("{col} IS NULL"),
            Lookup::Exact(val) => format!("{col} = {}", self.bind(params, val.clone())),
            Lookup::IExact(val) => {
                format!("LOWER({col}) = LOWER({})", self.bind(params, val.clone()))
            }
            Lookup::Gt(val) => format!("{col} > {}", self.bind(params, val.clone())),
            Lookup::Gte(val) => format!("{col} >= {}", self.bind(params, val.clone())),
            Lookup::Lt(val) => format!("{col} < {}", self.bind(params, val.clone())),
            Lookup::Lte(val) => format!("{col} <= {}", self.bind(params, val.clone())),
            Lookup::Contains(val) => self.like(&col, format!("%{}%", escape_like(val)), false, params),
            Lookup::IContains(val) => self.like(&col, format!("%{}%", escape_like(val)), true, params),
            Lookup::StartsWith(val) => self.like(&col, format!("{}%", escape_like(val)), false, params),
            Lookup::IStartsWith(val) => self.like(&col, format!("{}%", escape_like(val)), true, params),
            Lookup::EndsWith(val) => self.like(&col, format!("%{}", escape_like(val)), false, params),
            Lookup::IEndsWith(val) => self.like(&col, format!("%{}", escape_like(val)), true, params),
            Lookup::In(vals) if vals.is_empty() => "1=0".to_string(),
            Lookup::In(vals) => {
                let placeholders: Vec<String> =
                    vals.iter().map(|v| self.bind(params, v.clone())).collect();
                format!("{col} IN ({})", placeholders.join(", "))
            }
            Lookup::Range(low, high) => {
                let ph_low = self.bind(params, low.clone());
                let ph_high = self.bind(params, high.clone());
                format!("{col} BETWEEN {ph_low} AND {ph_high}")
            }
            Lookup::IsNull(true) => format!("{col} IS NULL"),
            Lookup::IsNull(false) => format!("{col} IS NOT NULL"),
            Lookup::Regex(pattern) => {
                let ph = self.bind(params, Value::String(pattern.clone()));
                match self.backend {
                    DatabaseBackendType::PostgreSQL => format!("{col} ~ {ph}"),
                    DatabaseBackendType::MySQL => format!("{col} REGEXP BINARY {ph}"),
                    DatabaseBackendType::SQLite => format!("{col} REGEXP {ph}"),
                }
            }
            Lookup::IRegex(pattern) => match self.backend {
                DatabaseBackendType::PostgreSQL => {
                    format!("{col} ~* {}", self.bind(params, Value::String(pattern.clone())))
                }
                DatabaseBackendType::MySQL => {
                    format!("{col} REGEXP {}", self.bind(params, Value::String(pattern.clone())))
                }
                DatabaseBackendType::SQLite => {
                    let ph = self.bind(params, Value::String(format!("(?i){pattern}")));
                    format!("{col} REGEXP {ph}")
                }
            },
            Lookup::Year(n) => self.date_part(&col, DatePart::Year, *n, params),
            Lookup::Month(n) => self.date_part(&col, DatePart::Month, *n, params),
            Lookup::Day(n) => self.date_part(&col, DatePart::Day, *n, params),
            Lookup::WeekDay(n) => self.date_part(&col, DatePart::WeekDay, *n, params),
        };
        sql.push_str(&fragment);
    }

    fn like(&self, col: &str, pattern: String, insensitive: bool, params: &mut Vec<Value>) -> String {
        let ph = self.bind(params, Value::String(pattern));
        // MySQL string literals treat a backslash as an escape character.
        let escape = match self.backend {
            DatabaseBackendType::MySQL => r"'\\'",
            _ => r"'\'",
        };
        match (insensitive, self.backend) {
            (false, _) => format!("{col} LIKE {ph} ESCAPE {escape}"),
            (true, DatabaseBackendType::PostgreSQL) => format!("{col} ILIKE {ph} ESCAPE {escape}"),
            (true, _) => format!("LOWER({col}) LIKE LOWER({ph}) ESCAPE {escape}"),
        }
    }

    fn date_part(&self, col: &str, part: DatePart, n: i64, params: &mut Vec<Value>) -> String {
        let expr = match self.backend {
            DatabaseBackendType::PostgreSQL => match part {
                DatePart::Year => format!("EXTRACT(YEAR FROM {col})"),
                DatePart::Month => format!("EXTRACT(MONTH FROM {col})"),
                DatePart::Day => format!("EXTRACT(DAY FROM {col})"),
                DatePart::WeekDay => format!("(EXTRACT(DOW FROM {col}) + 1)"),
            },
            DatabaseBackendType::MySQL => match part {
                DatePart::Year => format!("YEAR({col})"),
                DatePart::Month => format!("MONTH({col})"),
                DatePart::Day => format!("DAY({col})"),
                DatePart::WeekDay => format!("DAYOFWEEK({col})"),
            },
            DatabaseBackendType::SQLite => match part {
                DatePart::Year => format!("CAST(strftime('%Y', {col}) AS INTEGER)"),
                DatePart::Month => format!("CAST(strftime('%m', {col}) AS INTEGER)"),
                DatePart::Day => format!("CAST(strftime('%d', {col}) AS INTEGER)"),
                DatePart::WeekDay => format!("(CAST(strftime('%w', {col}) AS INTEGER) + 1)"),
            },
        };
        format!("{expr} = {}", self.bind(params, Value::Int(n)))
    }
}

#[derive(Debug, Clone, Copy)]
enum DatePart {
    Year,
    Month,
    Day,
    WeekDay,
}

/// Escapes the LIKE wildcards in user text so it matches literally.
fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
