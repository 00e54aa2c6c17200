//! # django-filter
//!
//! Declarative filtering of querysets from request parameters.
//!
//! A [`FilterSet`] is declared once with a list of [`Filter`]s, or with
//! filters generated from a model's field metadata. At request time it is
//! bound to a [`QueryDict`](django_filter_core::QueryDict); the filters'
//! form fields validate the input and each filter narrows the base
//! [`QuerySet`](django_filter_db::QuerySet) by its cleaned value.
//!
//! ## Modules
//!
//! - [`filters`] - Filter kinds, lookup specifications, preset date ranges
//! - [`filterset`] - The filter set, its builder, and strictness handling

#![allow(clippy::doc_markdown)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::needless_pass_by_value)]

pub mod filters;
pub mod filterset;

pub use filters::{model_choices, DateRangeOption, Filter, FilterAction, FilterKind, LookupSpec};
pub use filterset::{FilterSet, FilterSetBuilder};
