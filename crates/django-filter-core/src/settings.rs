//! Settings for the filtering layer.
//!
//! [`Settings`] holds the defaults every filter set falls back to when it is
//! not configured explicitly, and [`LazySettings`] is the globally-accessible,
//! lazily-initialized instance behind [`SETTINGS`].

use std::collections::HashMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::{FilterError, FilterResult};

/// What a filter set does with a bound form that fails validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrictMode {
    /// Apply the filters whose input validated and skip the rest.
    Ignore,
    /// Return an empty queryset.
    #[default]
    ReturnNone,
    /// Return a validation error carrying the per-field messages.
    Raise,
}

/// The complete set of filtering settings.
///
/// # Examples
///
/// ```
/// use django_filter_core::settings::{Settings, StrictMode};
///
/// let settings = Settings::default();
/// assert_eq!(settings.order_by_field, "o");
/// assert_eq!(settings.strict, StrictMode::ReturnNone);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Whether debug mode is enabled (pretty logs instead of JSON).
    pub debug: bool,
    /// The log level (e.g. "info", "debug", "django_filter=trace").
    pub log_level: String,
    /// Behaviour on invalid input.
    pub strict: StrictMode,
    /// The query parameter carrying the requested ordering.
    pub order_by_field: String,
    /// Label of the blank option rendered at the top of select widgets.
    pub empty_choice_label: String,
    /// Labels of the unknown/yes/no options of a null-boolean select.
    pub null_boolean_labels: [String; 3],
    /// Custom settings that don't fit into the above categories.
    pub extra: HashMap<String, serde_json::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: true,
            log_level: "info".to_string(),
            strict: StrictMode::ReturnNone,
            order_by_field: "o".to_string(),
            empty_choice_label: "---------".to_string(),
            null_boolean_labels: [
                "Unknown".to_string(),
                "Yes".to_string(),
                "No".to_string(),
            ],
            extra: HashMap::new(),
        }
    }
}

/// A lazily-initialized, globally-accessible settings container.
///
/// Call [`configure`](LazySettings::configure) once at startup. Until then
/// [`get`](LazySettings::get) hands out the built-in defaults.
pub struct LazySettings {
    inner: OnceLock<Settings>,
    defaults: OnceLock<Settings>,
}

impl Default for LazySettings {
    fn default() -> Self {
        Self::new()
    }
}

impl LazySettings {
    /// Creates a new, unconfigured `LazySettings`.
    pub const fn new() -> Self {
        Self {
            inner: OnceLock::new(),
            defaults: OnceLock::new(),
        }
    }

    /// Configures the global settings. May be called once.
    pub fn configure(&self, settings: Settings) -> FilterResult<()> {
        self.inner.set(settings).map_err(|_| {
            FilterError::ImproperlyConfigured("Settings have already been configured".to_string())
        })
    }

    /// Returns the configured settings, or the defaults if none were set.
    pub fn get(&self) -> &Settings {
        self.inner
            .get()
            .unwrap_or_else(|| self.defaults.get_or_init(Settings::default))
    }

    /// Returns `true` if settings have been configured.
    pub fn is_configured(&self) -> bool {
        self.inner.get().is_some()
    }
}

/// The global settings instance.
pub static SETTINGS: LazySettings = LazySettings::new();
