//! `reqwest`-backed transport: the base query every endpoint goes through.

use crate::error::CacheError;
use reqwest::{Client, Method};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use todo_query_core::http::{FetchError, HttpMethod, HttpRequest, HttpTransport};

/// Sends endpoint requests to a fixed base address and decodes JSON replies
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: Client,
    base_url: String,
}

impl ReqwestTransport {
    /// Create a transport for `base_url` (e.g. `http://localhost:5050`)
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Client`] if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, CacheError> {
        let client = Client::builder().build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Create a transport around an existing client
    #[must_use]
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// The base address requests are resolved against
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }

    async fn send(&self, request: HttpRequest) -> Result<Value, FetchError> {
        let method = match request.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        };

        let mut builder = self.client.request(method, self.url(&request.path));
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| FetchError::Fetch(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| FetchError::Fetch(e.to_string()))?;

        if status.is_success() {
            if text.trim().is_empty() {
                return Ok(Value::Null);
            }
            serde_json::from_str(&text).map_err(|e| FetchError::Parsing {
                status: status.as_u16(),
                data: text,
                error: e.to_string(),
            })
        } else {
            let data = serde_json::from_str(&text).unwrap_or(Value::String(text));
            Err(FetchError::Http {
                status: status.as_u16(),
                data,
            })
        }
    }
}

impl HttpTransport for ReqwestTransport {
    fn execute(
        &self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Value, FetchError>> + Send + '_>> {
        Box::pin(self.send(request))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_creation() {
        let transport = ReqwestTransport::new("http://localhost:5050/").unwrap();
        assert_eq!(transport.base_url(), "http://localhost:5050");
        assert_eq!(transport.url("/todos/3"), "http://localhost:5050/todos/3");
        assert_eq!(transport.url("todos"), "http://localhost:5050/todos");
    }
}
