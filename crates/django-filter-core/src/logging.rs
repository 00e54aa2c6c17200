//! Logging integration.
//!
//! Provides a helper for configuring [`tracing`]-based logging from
//! [`Settings`](crate::settings::Settings) and the span filter sets run in.

use crate::settings::Settings;

/// Sets up the global tracing subscriber based on the given settings.
///
/// The log level is read from `settings.log_level` (e.g. "debug", "info",
/// "django_filter=trace"). In debug mode a pretty, human-readable format is
/// used; otherwise a structured JSON format is used. Installing a second
/// subscriber is a no-op.
pub fn setup_logging(settings: &Settings) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&settings.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    if settings.debug {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(true)
            .with_line_number(true)
            .pretty()
            .try_init()
            .ok();
    } else {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .try_init()
            .ok();
    }
}

/// Creates the span a filter set evaluates its queryset in.
///
/// # Examples
///
/// ```
/// use django_filter_core::logging::filterset_span;
///
/// let span = filterset_span("books");
/// let _guard = span.enter();
/// tracing::debug!("applying filters");
/// ```
pub fn filterset_span(table: &str) -> tracing::Span {
    tracing::debug_span!("filterset", table = table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_logging_twice_is_harmless() {
        let mut settings = Settings::default();
        settings.debug = false;
        settings.log_level = "not a = valid [filter".to_string();
        setup_logging(&settings);
        setup_logging(&settings);
    }
}
