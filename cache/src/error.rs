//! Error types for the cache layer.

use thiserror::Error;

/// Errors raised while defining or addressing an api
#[derive(Error, Debug)]
pub enum CacheError {
    /// No endpoint with this name exists on the api
    #[error("Unknown endpoint: {0}")]
    UnknownEndpoint(String),

    /// The endpoint exists but is the wrong kind for the operation
    #[error("Endpoint {endpoint} is not a {expected}")]
    WrongKind {
        /// Endpoint name
        endpoint: String,
        /// The kind the operation needs
        expected: &'static str,
    },

    /// The api definition is unusable
    #[error("Invalid api definition: {0}")]
    Definition(String),

    /// Arguments could not be turned into JSON
    #[error("Failed to serialize arguments: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The transport could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}
