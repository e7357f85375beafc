//! Configuration management for the todo client.
//!
//! Loads configuration from environment variables (and a `.env` file when
//! present) with defaults that match a local development server.

use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use todo_query_cache::DEFAULT_KEEP_UNUSED_DATA_FOR;

/// Default address of the todo server
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5050";

const DEFAULT_LOG_FILTER: &str = "info,todo=debug";

/// An environment variable held a value that could not be parsed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid value {value:?} for {name}: {reason}")]
pub struct ConfigError {
    /// Variable name
    pub name: &'static str,
    /// Raw value
    pub value: String,
    /// Parser message
    pub reason: String,
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base address every request path is appended to (`TODO_API_BASE_URL`)
    pub api_base_url: String,
    /// Grace period for unobserved cache entries (`TODO_KEEP_UNUSED_SECS`)
    pub keep_unused_data_for: Duration,
    /// Refetch interval for the list while mounted (`TODO_POLLING_MS`, unset = off)
    pub polling_interval: Option<Duration>,
    /// Prometheus exporter address (`METRICS_ADDR`, unset = no exporter)
    pub metrics_addr: Option<SocketAddr>,
    /// Tracing filter directives (`RUST_LOG`)
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            keep_unused_data_for: DEFAULT_KEEP_UNUSED_DATA_FOR,
            polling_interval: None,
            metrics_addr: None,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

fn parse<T>(name: &'static str, value: String) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let parsed = value.trim().parse::<T>();
    parsed.map_err(|e| ConfigError {
        name,
        reason: e.to_string(),
        value,
    })
}

impl Config {
    /// Load configuration from the process environment, reading `.env` first
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is set to an unparsable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env");
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is set to an unparsable value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let api_base_url = var("TODO_API_BASE_URL").unwrap_or(defaults.api_base_url);
        let keep_unused_data_for = var("TODO_KEEP_UNUSED_SECS")
            .map(|value| parse("TODO_KEEP_UNUSED_SECS", value).map(Duration::from_secs))
            .transpose()?
            .unwrap_or(defaults.keep_unused_data_for);
        let polling_interval = var("TODO_POLLING_MS")
            .map(|value| parse("TODO_POLLING_MS", value).map(Duration::from_millis))
            .transpose()?
            .filter(|interval| !interval.is_zero());
        let metrics_addr = var("METRICS_ADDR")
            .map(|value| parse("METRICS_ADDR", value))
            .transpose()?;
        let log_filter = var("RUST_LOG").unwrap_or(defaults.log_filter);

        Ok(Self {
            api_base_url,
            keep_unused_data_for,
            polling_interval,
            metrics_addr,
            log_filter,
        })
    }
}
