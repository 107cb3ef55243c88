//! Logging integration for sqlrepo-rs.
//!
//! Provides helpers for configuring [`tracing`]-based logging from
//! [`Settings`](crate::settings::Settings) and for creating per-statement spans.

use crate::settings::Settings;

/// Sets up the global tracing subscriber based on the given settings.
///
/// The filter is read from `settings.log_level` (e.g. "info",
/// "sqlrepo_db=debug"). Debug mode uses a pretty, human-readable format;
/// otherwise a structured JSON format is used. Installing a second subscriber
/// is a no-op.
pub fn setup_logging(settings: &Settings) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&settings.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    if settings.debug {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
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

/// Creates a tracing span for building one statement.
///
/// # Examples
///
/// ```
/// use sqlrepo_core::logging::statement_span;
///
/// let span = statement_span("fetch-list", "my_model");
/// let _guard = span.enter();
/// tracing::debug!("resolving joins");
/// ```
pub fn statement_span(kind: &str, table: &str) -> tracing::Span {
    tracing::debug_span!("statement", kind, table)
}
