//! Logging setup for quill binaries.
//!
//! Logs always go to stderr; stdout carries resolved documents and JSON output.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{AppError, AppResult};

/// Output shape of log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Build the filter used by [`init_logging`].
///
/// Precedence: explicit level, then `RUST_LOG`, then `info`.
pub fn build_filter(log_level: Option<&str>) -> AppResult<EnvFilter> {
    let env_level = std::env::var("RUST_LOG").ok();
    let directive = log_level
        .or(env_level.as_deref())
        .unwrap_or("info");

    EnvFilter::try_new(directive)
        .map_err(|e| AppError::Config(format!("Invalid log filter '{}': {}", directive, e)))
}

/// Install the global tracing subscriber.
///
/// # Example
/// ```no_run
/// use quill_core::logging::{init_logging, LogFormat};
///
/// init_logging(Some("debug"), false, LogFormat::Text).expect("logging");
/// ```
pub fn init_logging(log_level: Option<&str>, no_color: bool, format: LogFormat) -> AppResult<()> {
    let filter = build_filter(log_level)?;
    let ansi = !no_color && std::env::var_os("NO_COLOR").is_none();

    let result = match format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_ansi(ansi),
            )
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    };

    result.map_err(|e| AppError::Config(format!("Failed to init logging: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_level_is_accepted() {
        assert!(build_filter(Some("quill_prompt=trace,warn")).is_ok());
    }

    #[test]
    fn test_invalid_level_is_config_error() {
        let err = build_filter(Some("quill=loudest")).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
