//! Application-level error type.

use crate::config::ConfigError;
use thiserror::Error;
use todo_query_cache::CacheError;
use todo_query_runtime::metrics::MetricsError;
use todo_query_runtime::StoreError;

/// Errors surfaced by the todo client
#[derive(Error, Debug)]
pub enum AppError {
    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Api definition, transport setup or command encoding failed
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// The store refused or timed out
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The metrics exporter could not start
    #[error(transparent)]
    Metrics(#[from] MetricsError),

    /// Terminal I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
