//! # django-filter-core
//!
//! Core types shared by every django-filter-rs crate. This crate has no
//! internal dependencies and provides the foundation for the query, form, and
//! filter layers.
//!
//! ## Modules
//!
//! - [`error`] - Error types and result aliases
//! - [`utils`] - Utility types (`MultiValueDict`)
//! - [`querydict`] - Query string / form data dictionary
//! - [`settings`] - Filtering settings and global configuration
//! - [`settings_loader`] - Loading settings from TOML, JSON, and the environment
//! - [`logging`] - Tracing-based logging integration

pub mod error;
pub mod logging;
pub mod querydict;
pub mod settings;
pub mod settings_loader;
pub mod utils;

// Re-export the most commonly used types at the crate root.
pub use error::{FilterError, FilterResult, ValidationError};
pub use querydict::QueryDict;
pub use settings::{Settings, StrictMode, SETTINGS};
