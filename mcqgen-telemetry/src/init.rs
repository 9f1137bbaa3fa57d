//! Global subscriber initialisation.

use thiserror::Error;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable selecting the log format (`json` or `text`).
pub const LOG_FORMAT_ENV: &str = "MCQGEN_LOG_FORMAT";

/// Filter directive used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

/// Output format of the fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    /// Parse a format name; anything other than `json` means text.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") { Self::Json } else { Self::Text }
    }

    /// Read the format from [`LOG_FORMAT_ENV`].
    pub fn from_env() -> Self {
        std::env::var(LOG_FORMAT_ENV).map(|v| Self::parse(&v)).unwrap_or_default()
    }
}

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("a global tracing subscriber is already installed: {0}")]
    AlreadyInitialized(String),
}

/// Install the global subscriber for `service_name` using the format from
/// the environment.
pub fn init_telemetry(service_name: &str) -> Result<(), TelemetryError> {
    init_with_format(service_name, LogFormat::from_env())
}

/// Install the global subscriber with an explicit format.
///
/// Filtering follows `RUST_LOG`, defaulting to [`DEFAULT_FILTER`]. Calling
/// this twice returns [`TelemetryError::AlreadyInitialized`].
pub fn init_with_format(service_name: &str, format: LogFormat) -> Result<(), TelemetryError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let result = match format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).json().with_current_span(true))
            .try_init(),
    };
    result.map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))?;

    tracing::debug!(service = service_name, ?format, "telemetry initialised");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parsing_is_lenient() {
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse(" json "), LogFormat::Json);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Text);
        assert_eq!(LogFormat::parse(""), LogFormat::Text);
    }

    #[test]
    fn second_initialisation_is_an_error() {
        // The first call may lose to another test in this binary; either way
        // a later call must fail.
        let _ = init_with_format("first", LogFormat::Text);
        let second = init_with_format("second", LogFormat::Json);
        assert!(matches!(second, Err(TelemetryError::AlreadyInitialized(_))));
    }
}
