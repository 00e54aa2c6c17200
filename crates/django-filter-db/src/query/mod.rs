//! Query building and compilation.
//!
//! - [`lookups`] - The lookup vocabulary and `Q` objects
//! - [`compiler`] - Query AST and SQL compilation
//! - [`queryset`] - The lazy, chainable `QuerySet`

pub mod compiler;
pub mod lookups;
pub mod queryset;

pub use compiler::{DatabaseBackendType, FromValue, OrderBy, Query, Row, SqlCompiler, WhereNode};
pub use lookups::{Lookup, LookupType, Q};
pub use queryset::QuerySet;
