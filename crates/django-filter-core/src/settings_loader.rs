//! Settings loading from configuration files.
//!
//! ## Loading Order
//!
//! 1. Start with default settings.
//! 2. Load from a TOML or JSON file (overriding defaults).
//! 3. Apply environment variable overrides (highest priority).
//!
//! ## Environment Variable Mapping
//!
//! | Env Var | Setting |
//! |---|---|
//! | `DJANGO_FILTER_DEBUG` | `debug` |
//! | `DJANGO_FILTER_LOG_LEVEL` | `log_level` |
//! | `DJANGO_FILTER_STRICT` | `strict` (`ignore`, `return_none`, `raise`) |
//! | `DJANGO_FILTER_ORDER_BY_FIELD` | `order_by_field` |
//! | `DJANGO_FILTER_EMPTY_CHOICE_LABEL` | `empty_choice_label` |
//!
//! ## Examples
//!
//! ```rust,no_run
//! use django_filter_core::settings_loader;
//!
//! let settings = settings_loader::from_toml_file_with_env("config/filters.toml").unwrap();
//! ```

use std::path::Path;

use crate::error::FilterError;
use crate::settings::{Settings, StrictMode};

/// Loads settings from a TOML string.
///
/// Keys missing from the TOML keep their default values.
pub fn from_toml_str(toml_str: &str) -> Result<Settings, FilterError> {
    let toml_value: toml::Value = toml::from_str(toml_str)
        .map_err(|e| FilterError::ConfigurationError(format!("Failed to parse TOML: {e}")))?;
    from_overrides(toml_to_json(toml_value), "TOML")
}

/// Loads settings from a TOML file.
pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Settings, FilterError> {
    from_toml_str(&read_config(path.as_ref(), "TOML")?)
}

/// Loads settings from a TOML file and then applies environment variable overrides.
pub fn from_toml_file_with_env(path: impl AsRef<Path>) -> Result<Settings, FilterError> {
    let mut settings = from_toml_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Loads settings from a JSON string.
pub fn from_json_str(json_str: &str) -> Result<Settings, FilterError> {
    let json_value: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| FilterError::ConfigurationError(format!("Failed to parse JSON: {e}")))?;
    from_overrides(json_value, "JSON")
}

/// Loads settings from a JSON file.
pub fn from_json_file(path: impl AsRef<Path>) -> Result<Settings, FilterError> {
    from_json_str(&read_config(path.as_ref(), "JSON")?)
}

/// Applies `DJANGO_FILTER_*` environment variable overrides.
pub fn apply_env_overrides(settings: &mut Settings) {
    apply_overrides_from(settings, |key| std::env::var(key).ok());
}

/// Applies overrides using `lookup` to resolve variable names.
///
/// Unparseable values (e.g. an unknown strict mode) are logged and ignored.
pub fn apply_overrides_from(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(val) = lookup("DJANGO_FILTER_DEBUG") {
        settings.debug = matches!(val.to_lowercase().as_str(), "true" | "1" | "yes");
    }

    if let Some(val) = lookup("DJANGO_FILTER_LOG_LEVEL") {
        settings.log_level = val;
    }

    if let Some(val) = lookup("DJANGO_FILTER_STRICT") {
        match val.to_lowercase().as_str() {
            "ignore" => settings.strict = StrictMode::Ignore,
            "return_none" => settings.strict = StrictMode::ReturnNone,
            "raise" => settings.strict = StrictMode::Raise,
            other => tracing::warn!(value = other, "ignoring unknown DJANGO_FILTER_STRICT"),
        }
    }

    if let Some(val) = lookup("DJANGO_FILTER_ORDER_BY_FIELD") {
        if !val.is_empty() {
            settings.order_by_field = val;
        }
    }

    if let Some(val) = lookup("DJANGO_FILTER_EMPTY_CHOICE_LABEL") {
        settings.empty_choice_label = val;
    }
}

// ============================================================
// Helpers
// ============================================================

fn read_config(path: &Path, format: &str) -> Result<String, FilterError> {
    std::fs::read_to_string(path).map_err(|e| {
        FilterError::ConfigurationError(format!(
            "Failed to read {format} file '{}': {e}",
            path.display()
        ))
    })
}

fn from_overrides(overrides: serde_json::Value, format: &str) -> Result<Settings, FilterError> {
    let default_json = serde_json::to_value(Settings::default()).map_err(|e| {
        FilterError::ConfigurationError(format!("Failed to serialize default settings: {e}"))
    })?;

    let merged = merge_json(default_json, overrides);
    serde_json::from_value(merged).map_err(|e| {
        FilterError::ConfigurationError(format!("Failed to deserialize settings from {format}: {e}"))
    })
}

/// Converts a TOML value to a `serde_json::Value`.
fn toml_to_json(value: toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(s) => serde_json::Value::String(s),
        toml::Value::Integer(i) => serde_json::json!(i),
        toml::Value::Float(f) => serde_json::json!(f),
        toml::Value::Boolean(b) => serde_json::Value::Bool(b),
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        toml::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(toml_to_json).collect())
        }
        toml::Value::Table(table) => {
            let map: serde_json::Map<String, serde_json::Value> = table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect();
            serde_json::Value::Object(map)
        }
    }
}

/// Deep-merges two JSON values. The `override_val` takes precedence.
fn merge_json(base: serde_json::Value, override_val: serde_json::Value) -> serde_json::Value {
    match (base, override_val) {
        (serde_json::Value::Object(mut base_map), serde_json::Value::Object(override_map)) => {
            for (key, override_v) in override_map {
                let merged = if let Some(base_v) = base_map.remove(&key) {
                    merge_json(base_v, override_v)
                } else {
                    override_v
                };
                base_map.insert(key, merged);
            }
            serde_json::Value::Object(base_map)
        }
        (_, override_val) => override_val,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_from_toml_str_basic() {
        let toml = r#"
            debug = false
            strict = "raise"
            order_by_field = "ordering"
        "#;

        let settings = from_toml_str(toml).unwrap();
        assert!(!settings.debug);
        assert_eq!(settings.strict, StrictMode::Raise);
        assert_eq!(settings.order_by_field, "ordering");
        assert_eq!(settings.empty_choice_label, "---------");
    }

    #[test]
    fn test_from_toml_str_extra_table() {
        let toml = r#"
            [extra]
            page_size = 25
        "#;

        let settings = from_toml_str(toml).unwrap();
        assert_eq!(settings.extra.get("page_size"), Some(&serde_json::json!(25)));
    }

    #[test]
    fn test_from_toml_str_empty() {
        let settings = from_toml_str("").unwrap();
        assert!(settings.debug);
        assert_eq!(settings.strict, StrictMode::ReturnNone);
    }

    #[test]
    fn test_from_toml_str_invalid() {
        assert!(from_toml_str("[[invalid toml content").is_err());
    }

    #[test]
    fn test_from_toml_str_bad_strict_mode() {
        let err = from_toml_str("strict = \"sometimes\"").unwrap_err();
        assert!(matches!(err, FilterError::ConfigurationError(_)));
    }

    #[test]
    fn test_from_json_str_basic() {
        let json = r#"{"log_level": "debug", "strict": "ignore"}"#;
        let settings = from_json_str(json).unwrap();
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.strict, StrictMode::Ignore);
        assert_eq!(settings.order_by_field, "o");
    }

    #[test]
    fn test_from_json_str_invalid() {
        assert!(from_json_str("{not json").is_err());
    }

    #[test]
    fn test_from_toml_file() {
        let dir = std::env::temp_dir().join("django_filter_test_toml");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("filters.toml");
        std::fs::write(&path, "log_level = \"warn\"\n").unwrap();

        let settings = from_toml_file(&path).unwrap();
        assert_eq!(settings.log_level, "warn");

        std::fs::remove_file(&path).ok();
        std::fs::remove_dir(&dir).ok();
    }

    #[test]
    fn test_from_json_file_missing() {
        let err = from_json_file("/nonexistent/path/filters.json").unwrap_err();
        assert!(err.to_string().contains("Failed to read JSON file"));
    }

    #[test]
    fn test_overrides() {
        let mut settings = Settings::default();
        apply_overrides_from(
            &mut settings,
            env(&[
                ("DJANGO_FILTER_DEBUG", "0"),
                ("DJANGO_FILTER_LOG_LEVEL", "trace"),
                ("DJANGO_FILTER_STRICT", "Raise"),
                ("DJANGO_FILTER_ORDER_BY_FIELD", "sort"),
                ("DJANGO_FILTER_EMPTY_CHOICE_LABEL", "Any"),
            ]),
        );
        assert!(!settings.debug);
        assert_eq!(settings.log_level, "trace");
        assert_eq!(settings.strict, StrictMode::Raise);
        assert_eq!(settings.order_by_field, "sort");
        assert_eq!(settings.empty_choice_label, "Any");
    }

    #[test]
    fn test_overrides_ignore_bad_values() {
        let mut settings = Settings::default();
        apply_overrides_from(
            &mut settings,
            env(&[
                ("DJANGO_FILTER_STRICT", "sometimes"),
                ("DJANGO_FILTER_ORDER_BY_FIELD", ""),
            ]),
        );
        assert_eq!(settings.strict, StrictMode::ReturnNone);
        assert_eq!(settings.order_by_field, "o");
    }

    #[test]
    fn test_merge_json_nested() {
        let base = serde_json::json!({"a": {"b": 1, "c": 2}});
        let over = serde_json::json!({"a": {"c": 3}});
        assert_eq!(merge_json(base, over), serde_json::json!({"a": {"b": 1, "c": 3}}));
    }
}
