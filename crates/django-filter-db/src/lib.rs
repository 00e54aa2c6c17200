//! # django-filter-db
//!
//! The query layer filters narrow. A [`QuerySet`](query::QuerySet) builds a
//! [`Query`](query::Query) AST through method chaining without touching the
//! database; SQL is only generated when the queryset is compiled or executed,
//! at which point the [`SqlCompiler`](query::SqlCompiler) renders parameterized
//! SQL for the target backend.
//!
//! ## Module Overview
//!
//! - [`value`] - The backend-agnostic [`Value`](value::Value) enum
//! - [`query`] - Lookup vocabulary, `Q` objects, compilation, and `QuerySet`
//! - [`model`] - The [`Model`](model::Model) trait and [`ModelMeta`](model::ModelMeta)
//! - [`fields`] - Model field metadata used to derive filters
//! - [`executor`] - The async [`DbExecutor`](executor::DbExecutor) trait
//! - [`backends`] - Concrete executors (SQLite)

#![allow(clippy::format_push_string)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::significant_drop_tightening)]

pub mod backends;
pub mod executor;
pub mod fields;
pub mod model;
pub mod query;
pub mod value;

// Re-export the most commonly used types at the crate root.
pub use executor::DbExecutor;
pub use fields::{FieldDef, FieldType};
pub use model::{Model, ModelMeta};
pub use query::{
    DatabaseBackendType, Lookup, LookupType, OrderBy, Query, QuerySet, Row, SqlCompiler,
    WhereNode, Q,
};
pub use value::Value;

#[cfg(feature = "sqlite")]
pub use backends::sqlite::SqliteBackend;
