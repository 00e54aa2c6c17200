//! Core error types for django-filter-rs.
//!
//! [`FilterError`] covers everything that can go wrong while turning user
//! input into query predicates: invalid lookups, values that cannot feed a
//! lookup, form validation failures, configuration mistakes, and database
//! errors raised while executing a filtered queryset.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

/// Represents a validation error with optional field-level errors.
///
/// Validation errors can be either simple (a single message) or compound
/// (containing per-field error lists). A filter set raises the compound form
/// when it runs in [`StrictMode::Raise`](crate::settings::StrictMode::Raise).
///
/// # Examples
///
/// ```
/// use django_filter_core::error::ValidationError;
///
/// let err = ValidationError::new("Enter a number.", "invalid");
/// assert_eq!(err.to_string(), "Enter a number.");
///
/// let mut field_errors = std::collections::HashMap::new();
/// field_errors.insert(
///     "price".to_string(),
///     vec![ValidationError::new("Enter a number.", "invalid")],
/// );
/// let err = ValidationError::with_field_errors(field_errors);
/// assert_eq!(err.to_string(), "price: Enter a number.");
/// ```
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The primary error message.
    pub message: String,
    /// A short code identifying the type of validation failure (e.g. "required", "invalid").
    pub code: String,
    /// Additional parameters providing context for the error message.
    pub params: HashMap<String, String>,
    /// Per-field validation errors, keyed by field name.
    pub field_errors: HashMap<String, Vec<Self>>,
}

impl ValidationError {
    /// Creates a new `ValidationError` with a message and code.
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            params: HashMap::new(),
            field_errors: HashMap::new(),
        }
    }

    /// Creates a `ValidationError` containing per-field errors.
    pub fn with_field_errors(field_errors: HashMap<String, Vec<Self>>) -> Self {
        Self {
            message: String::new(),
            code: String::new(),
            params: HashMap::new(),
            field_errors,
        }
    }

    /// Builds a compound error from the message lists a form produces.
    pub fn from_form_errors(errors: &HashMap<String, Vec<String>>) -> Self {
        let field_errors = errors
            .iter()
            .map(|(field, messages)| {
                let list = messages
                    .iter()
                    .map(|m| Self::new(m.clone(), "invalid"))
                    .collect();
                (field.clone(), list)
            })
            .collect();
        Self::with_field_errors(field_errors)
    }

    /// Adds a parameter to this validation error.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.message.is_empty() {
            write!(f, "{}", self.message)?;
        } else if !self.field_errors.is_empty() {
            let mut fields: Vec<&String> = self.field_errors.keys().collect();
            fields.sort();
            let mut first = true;
            for field in fields {
                for error in &self.field_errors[field] {
                    if !first {
                        write!(f, "; ")?;
                    }
                    write!(f, "{field}: {error}")?;
                    first = false;
                }
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// The primary error type for django-filter-rs.
#[derive(Error, Debug)]
pub enum FilterError {
    // ── Filtering ────────────────────────────────────────────────────

    /// A lookup type name is not part of the query vocabulary, or is not
    /// offered by the filter it was submitted to.
    #[error("Invalid lookup type: {0}")]
    InvalidLookup(String),

    /// A validated value cannot be used as the operand of a lookup.
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue {
        /// The field the value was meant for.
        field: String,
        /// What was wrong with it.
        message: String,
    },

    /// A filter refers to a model field that does not exist.
    #[error("Field does not exist: {0}")]
    FieldDoesNotExist(String),

    // ── Validation ───────────────────────────────────────────────────

    /// One or more fields failed validation.
    #[error("Validation error: {0}")]
    ValidationError(ValidationError),

    // ── Configuration ────────────────────────────────────────────────

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// A filter or filter set is improperly configured.
    #[error("Improperly configured: {0}")]
    ImproperlyConfigured(String),

    // ── Database ─────────────────────────────────────────────────────

    /// Raised when a query expected exactly one result but found none.
    #[error("Object does not exist: {0}")]
    DoesNotExist(String),

    /// A generic database error.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// An operational database error (connection failure, etc.).
    #[error("Operational error: {0}")]
    OperationalError(String),

    // ── IO ───────────────────────────────────────────────────────────

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    // ── Security ─────────────────────────────────────────────────────

    /// A potentially malicious operation was detected.
    #[error("Suspicious operation: {0}")]
    SuspiciousOperation(String),
}

impl FilterError {
    /// Returns the HTTP status code a web layer should answer with.
    ///
    /// - `InvalidLookup`, `InvalidValue`, `ValidationError` -> 400
    /// - `SuspiciousOperation` -> 403
    /// - `DoesNotExist` -> 404
    /// - Everything else -> 500
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidLookup(_) | Self::InvalidValue { .. } | Self::ValidationError(_) => 400,
            Self::SuspiciousOperation(_) => 403,
            Self::DoesNotExist(_) => 404,
            Self::FieldDoesNotExist(_)
            | Self::ConfigurationError(_)
            | Self::ImproperlyConfigured(_)
            | Self::DatabaseError(_)
            | Self::OperationalError(_)
            | Self::IoError(_) => 500,
        }
    }

    /// Shorthand for an [`InvalidValue`](Self::InvalidValue) error.
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<ValidationError> for FilterError {
    fn from(err: ValidationError) -> Self {
        Self::ValidationError(err)
    }
}

/// A convenience type alias for `Result<T, FilterError>`.
pub type FilterResult<T> = Result<T, FilterError>;
