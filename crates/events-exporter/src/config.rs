//! Command-line and environment configuration.

use std::net::SocketAddr;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::error::ExporterResult;
use crate::selector::FieldSelector;
use crate::source::STDIN_PATH;

/// Prometheus exporter for Kubernetes events.
#[derive(Parser, Debug, Clone)]
#[command(name = "events-exporter")]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Address to expose metrics on.
    #[arg(long, env = "EVENTS_EXPORTER_ADDRESS", default_value = "0.0.0.0:9000")]
    pub exporter_address: SocketAddr,

    /// Log level filter; `RUST_LOG` takes precedence when set.
    #[arg(long, env = "EVENTS_EXPORTER_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format.
    #[arg(long, env = "EVENTS_EXPORTER_LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,

    /// Path of the JSON events stream, `-` for standard input.
    #[arg(long, env = "EVENTS_EXPORTER_EVENTS_SOURCE", default_value = STDIN_PATH)]
    pub events_source: String,

    /// Field selector applied to incoming events, e.g. `type=Warning`.
    #[arg(long, env = "EVENTS_EXPORTER_FIELD_SELECTOR", default_value = "")]
    pub field_selector: String,

    /// Do not expose the event message label (reduces cardinality).
    #[arg(long, env = "EVENTS_EXPORTER_OMIT_EVENTS_MESSAGES")]
    pub omit_events_messages: bool,

    /// How long an event is exposed after its last update.
    #[arg(long, env = "EVENTS_EXPORTER_EVENTS_TTL", default_value = "1h", value_parser = humantime::parse_duration)]
    pub events_ttl: Duration,

    /// How often expired events are removed.
    #[arg(long, env = "EVENTS_EXPORTER_SWEEP_INTERVAL", default_value = "1s", value_parser = parse_interval)]
    pub sweep_interval: Duration,
}

impl Config {
    /// Parses the configured field selector.
    ///
    /// # Errors
    ///
    /// Returns an error if the selector is malformed.
    pub fn selector(&self) -> ExporterResult<FieldSelector> {
        FieldSelector::parse(&self.field_selector)
    }
}

/// Log output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Human-readable text.
    Text,
}

fn parse_interval(s: &str) -> Result<Duration, String> {
    let interval = humantime::parse_duration(s).map_err(|e| e.to_string())?;
    if interval.is_zero() {
        return Err("interval must be greater than zero".to_string());
    }
    Ok(interval)
}
