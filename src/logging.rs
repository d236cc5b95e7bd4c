//! Logging initialization
//!
//! Sets up a layered subscriber:
//!
//! ```text
//! Registry
//!   ├── EnvFilter (RUST_LOG, falls back to the configured level)
//!   └── Fmt Layer (pretty or JSON)
//! ```

use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Logging setup errors
#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("unknown log format '{0}', expected 'pretty' or 'json'")]
    UnknownFormat(String),

    #[error("invalid log level '{level}': {message}")]
    InvalidLevel { level: String, message: String },

    #[error("failed to set global subscriber (may already be initialized): {0}")]
    AlreadyInitialized(String),
}

/// Build the filter: `RUST_LOG` wins over the configured level
fn env_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level).map_err(|e| LoggingError::InvalidLevel {
            level: level.to_string(),
            message: e.to_string(),
        }),
    }
}

/// Initialize the global subscriber
///
/// Must be called once, before any tracing macros are used. Logs go to
/// stderr so command output on stdout stays clean.
pub fn init_logging(level: &str, format: &str) -> Result<(), LoggingError> {
    let filter = env_filter(level)?;

    match format {
        "json" => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .map_err(|e| LoggingError::AlreadyInitialized(e.to_string())),
        "pretty" => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .map_err(|e| LoggingError::AlreadyInitialized(e.to_string())),
        other => Err(LoggingError::UnknownFormat(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_format_rejected() {
        let result = init_logging("info", "xml");
        assert!(matches!(result, Err(LoggingError::UnknownFormat(_))));
    }

    #[test]
    fn test_init_twice_fails_second_time() {
        let _ = init_logging("debug", "pretty");
        // Another test may have installed it first, either way a second call fails.
        assert!(init_logging("debug", "json").is_err());
    }
}
