//! Tracing subscriber setup.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LogFormat;
use crate::error::{ExporterError, ExporterResult};

/// Builds the level filter: `RUST_LOG` if set, `level` otherwise.
///
/// # Errors
///
/// Returns an error if `level` is not a valid filter directive.
pub fn filter(level: &str) -> ExporterResult<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level).map_err(|e| ExporterError::Logging(format!("invalid log level {level:?}: {e}")))
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns an error if the level is invalid or a subscriber is already set.
pub fn init(level: &str, format: LogFormat) -> ExporterResult<()> {
    let filter = filter(level)?;
    let layer = match format {
        LogFormat::Json => fmt::layer().json().boxed(),
        LogFormat::Text => fmt::layer().boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .try_init()
        .map_err(|e| ExporterError::Logging(e.to_string()))
}
