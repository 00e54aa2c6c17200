//! # django-filter-forms
//!
//! The form layer filters collect their input through. Every filter owns a
//! [`FormFieldDef`](fields::FormFieldDef); a filter set gathers them into a
//! [`BaseForm`](form::BaseForm), binds the request's query string, and
//! validates it before any filtering happens.
//!
//! ## Module Overview
//!
//! - [`fields`] - Field types and [`clean_field_value`](fields::clean_field_value)
//! - [`widgets`] - Reading raw input from a `QueryDict` and rendering HTML
//! - [`form`] - The async [`Form`](form::Form) trait and `BaseForm`
//! - [`bound_field`] - Fields paired with their input for rendering
//! - [`validation`] - The field-then-form validation pipeline

#![allow(clippy::format_push_string)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::option_if_let_else)]

pub mod bound_field;
pub mod fields;
pub mod form;
pub mod validation;
pub mod widgets;

pub use bound_field::BoundField;
pub use fields::{clean_field_value, FormFieldDef, FormFieldType};
pub use form::{BaseForm, Form};
pub use widgets::{RawValue, Widget, WidgetType};
