//! HTTP transport abstraction for remote data fetching.
//!
//! The cache layer never talks to the network directly. It describes requests
//! as [`HttpRequest`] values inside `Effect::Http`, and the runtime executes them
//! against whatever [`HttpTransport`] the environment carries.
//!
//! # Implementations
//!
//! - `ReqwestTransport` (in `todo-query-cache`): Production implementation
//! - `MockTransport` (in `todo-query-testing`): Scripted responses for tests
//!
//! # Errors
//!
//! Failures are transport-level only. A non-2xx answer, an unreachable host and
//! an unparseable body are all [`FetchError`] values; nothing above the transport
//! distinguishes validation errors from server errors.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// HTTP verbs used by endpoint definitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `PATCH`
    Patch,
    /// `DELETE`
    Delete,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let verb = match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        };
        f.write_str(verb)
    }
}

/// A request relative to the transport's base address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpRequest {
    /// HTTP verb
    pub method: HttpMethod,
    /// Path appended to the base address, e.g. `/todos/3`
    pub path: String,
    /// Optional JSON body
    pub body: Option<Value>,
}

impl HttpRequest {
    /// Create a request without a body
    #[must_use]
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
        }
    }

    /// `GET path`
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    /// `POST path`
    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    /// `PATCH path`
    #[must_use]
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Patch, path)
    }

    /// `DELETE path`
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    /// Attach a JSON body
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

impl std::fmt::Display for HttpRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// Errors produced by a transport
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// The server answered with a non-2xx status
    #[error("HTTP {status}: {data}")]
    Http {
        /// Status code
        status: u16,
        /// Response body (JSON if it parsed, otherwise a string)
        data: Value,
    },

    /// The request never produced a response (connection refused, DNS, ...)
    #[error("FETCH_ERROR: {0}")]
    Fetch(String),

    /// A 2xx response whose body was not valid JSON
    #[error("PARSING_ERROR: {error}")]
    Parsing {
        /// Status of the response that failed to parse
        status: u16,
        /// Raw body text
        data: String,
        /// Parser message
        error: String,
    },

    /// Raised by a response transform rather than the transport
    #[error("CUSTOM_ERROR: {0}")]
    Custom(String),
}

impl FetchError {
    /// The bare status: the numeric code for HTTP errors, a marker string otherwise
    #[must_use]
    pub fn status(&self) -> Value {
        match self {
            Self::Http { status, .. } => Value::from(*status),
            Self::Fetch(_) => Value::from("FETCH_ERROR"),
            Self::Parsing { .. } => Value::from("PARSING_ERROR"),
            Self::Custom(_) => Value::from("CUSTOM_ERROR"),
        }
    }

    /// The structured JSON shape stored in a cache entry
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Http { status, data } => json!({ "status": status, "data": data }),
            Self::Fetch(error) => json!({ "status": "FETCH_ERROR", "error": error }),
            Self::Parsing {
                status,
                data,
                error,
            } => json!({
                "status": "PARSING_ERROR",
                "originalStatus": status,
                "data": data,
                "error": error,
            }),
            Self::Custom(error) => json!({ "status": "CUSTOM_ERROR", "error": error }),
        }
    }
}

/// Executes HTTP requests on behalf of the runtime.
///
/// # Dyn Compatibility
///
/// This trait uses explicit `Pin<Box<dyn Future>>` returns instead of `async fn`
/// so it can be held as `Arc<dyn HttpTransport>` inside effects.
pub trait HttpTransport: Send + Sync {
    /// Send the request and decode the response body as JSON.
    ///
    /// An empty body decodes to `Value::Null`.
    ///
    /// # Errors
    ///
    /// - `Http`: non-2xx status
    /// - `Fetch`: no response was received
    /// - `Parsing`: the body was not JSON
    fn execute(
        &self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Value, FetchError>> + Send + '_>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_numeric_for_http_errors() {
        let error = FetchError::Http {
            status: 500,
            data: json!({ "message": "boom" }),
        };
        assert_eq!(error.status(), json!(500));
        assert_eq!(error.to_value()["data"]["message"], "boom");
    }

    #[test]
    fn status_is_marker_for_network_errors() {
        let error = FetchError::Fetch("connection refused".into());
        assert_eq!(error.status(), json!("FETCH_ERROR"));
        assert_eq!(error.to_value()["error"], "connection refused");
    }

    #[test]
    fn request_display() {
        let request = HttpRequest::patch("/todos/3").with_body(json!({ "id": 3 }));
        assert_eq!(request.to_string(), "PATCH /todos/3");
        assert_eq!(request.body, Some(json!({ "id": 3 })));
    }
}
