//! Shared configuration for the hullhub service and client.
//!
//! Settings come from command-line flags with `HULLHUB_*` environment
//! fallbacks, then built-in defaults. The resolved [`Config`] is plain data:
//! the daemon converts it into service settings and telemetry options.

mod defaults;
mod logging;
mod socket;
mod strategy;

use std::ffi::OsString;
use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use defaults::{
    DEFAULT_AREA_THRESHOLD, DEFAULT_CONNECT_HOST, DEFAULT_LOG_FILTER, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_READ_TIMEOUT_MS, DEFAULT_TCP_HOST, DEFAULT_TCP_PORT, DEFAULT_WRITE_TIMEOUT_MS,
    default_connect_endpoint, default_listen_endpoint, default_log_filter, default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use socket::{SocketDirError, SocketEndpoint, SocketParseError};
pub use strategy::{DispatchStrategy, DispatchStrategyParseError};

/// Resolved service configuration.
#[derive(Debug, Clone, PartialEq, Parser, Serialize, Deserialize)]
#[command(
    name = "hullhubd",
    version,
    about = "Shared convex hull graph service"
)]
pub struct Config {
    /// Endpoint to accept clients on (`tcp://host:port` or `unix:///path`).
    #[arg(long, env = "HULLHUB_LISTEN", default_value_t = default_listen_endpoint())]
    listen: SocketEndpoint,

    /// Session scheduling strategy.
    #[arg(long, env = "HULLHUB_STRATEGY", default_value_t = DispatchStrategy::default())]
    strategy: DispatchStrategy,

    /// Hull area at or above which the watcher reports a crossing.
    #[arg(
        long,
        env = "HULLHUB_AREA_THRESHOLD",
        default_value_t = DEFAULT_AREA_THRESHOLD,
        value_parser = parse_threshold
    )]
    area_threshold: f64,

    /// Readiness poll timeout in milliseconds.
    #[arg(
        long,
        env = "HULLHUB_POLL_INTERVAL_MS",
        default_value_t = DEFAULT_POLL_INTERVAL_MS,
        value_parser = clap::value_parser!(u64).range(1..=1000)
    )]
    poll_interval_ms: u64,

    /// Worker read timeout in milliseconds.
    #[arg(
        long,
        env = "HULLHUB_READ_TIMEOUT_MS",
        default_value_t = DEFAULT_READ_TIMEOUT_MS,
        value_parser = clap::value_parser!(u64).range(10..=60_000)
    )]
    read_timeout_ms: u64,

    /// Reply write timeout in milliseconds.
    #[arg(
        long,
        env = "HULLHUB_WRITE_TIMEOUT_MS",
        default_value_t = DEFAULT_WRITE_TIMEOUT_MS,
        value_parser = clap::value_parser!(u64).range(10..=60_000)
    )]
    write_timeout_ms: u64,

    /// Log filter expression, e.g. `info` or `hullhubd::executor=debug`.
    #[arg(long, env = "HULLHUB_LOG_FILTER", default_value = DEFAULT_LOG_FILTER)]
    log_filter: String,

    /// Log output format.
    #[arg(long, env = "HULLHUB_LOG_FORMAT", default_value_t = default_log_format())]
    log_format: LogFormat,
}

/// Errors surfaced while resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Arguments or environment values were rejected.
    #[error("{0}")]
    Arguments(#[from] clap::Error),
}

impl Config {
    /// Loads configuration from the process arguments and environment.
    ///
    /// Prints usage and exits the process when the arguments are invalid or
    /// when `--help`/`--version` is requested.
    #[must_use]
    pub fn load() -> Self {
        Self::parse()
    }

    /// Loads configuration from an explicit argument list.
    ///
    /// The first item is treated as the program name.
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Ok(Self::try_parse_from(args)?)
    }

    /// Endpoint clients connect to.
    #[must_use]
    pub fn listen(&self) -> &SocketEndpoint {
        &self.listen
    }

    /// Strategy used to schedule sessions.
    #[must_use]
    pub fn strategy(&self) -> DispatchStrategy {
        self.strategy
    }

    /// Hull area threshold watched by the threshold monitor.
    #[must_use]
    pub fn area_threshold(&self) -> f64 {
        self.area_threshold
    }

    /// Upper bound on a single readiness poll.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Read timeout applied to blocking worker connections.
    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Budget for writing replies to a client.
    #[must_use]
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen_endpoint(),
            strategy: DispatchStrategy::default(),
            area_threshold: DEFAULT_AREA_THRESHOLD,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            write_timeout_ms: DEFAULT_WRITE_TIMEOUT_MS,
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
            log_format: default_log_format(),
        }
    }
}

fn parse_threshold(raw: &str) -> Result<f64, String> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|error| format!("'{raw}' is not a number: {error}"))?;
    if !value.is_finite() || value < 0.0 {
        return Err(format!("'{raw}' must be a finite, non-negative area"));
    }
    Ok(value)
}
