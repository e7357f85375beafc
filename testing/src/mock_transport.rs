//! Scripted HTTP transport for exercising the cache without a server.
//!
//! Responses are queued per route (`METHOD path`). Each request pops the next
//! queued response; the last one keeps answering once the queue is drained.
//! Requests that match no route fall through to an optional handler and then
//! to a `404` error. Every request is recorded for later assertions.

use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use todo_query_core::http::{FetchError, HttpMethod, HttpRequest, HttpTransport};

type Handler = Arc<dyn Fn(&HttpRequest) -> Option<Result<Value, FetchError>> + Send + Sync>;

#[derive(Default)]
struct Inner {
    routes: HashMap<(HttpMethod, String), VecDeque<Result<Value, FetchError>>>,
    requests: Vec<HttpRequest>,
}

/// In-memory [`HttpTransport`] with scripted responses.
///
/// # Example
///
/// ```
/// use todo_query_testing::MockTransport;
/// use todo_query_core::http::{HttpMethod, HttpRequest, HttpTransport};
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let transport = MockTransport::new()
///     .respond(HttpMethod::Get, "/todos", Ok(json!([])));
///
/// let body = transport.execute(HttpRequest::get("/todos")).await;
/// assert_eq!(body, Ok(json!([])));
/// assert_eq!(transport.request_count(HttpMethod::Get, "/todos"), 1);
/// # });
/// ```
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<RwLock<Inner>>,
    handler: Option<Handler>,
    latency: Option<Duration>,
}

impl MockTransport {
    /// Create a transport with no routes
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for `method path`
    #[must_use]
    pub fn respond(self, method: HttpMethod, path: &str, response: Result<Value, FetchError>) -> Self {
        self.push(method, path, response);
        self
    }

    /// Queue a response on an already shared transport
    pub fn push(&self, method: HttpMethod, path: &str, response: Result<Value, FetchError>) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .routes
            .entry((method, path.to_string()))
            .or_default()
            .push_back(response);
    }

    /// Answer unscripted requests with a closure
    #[must_use]
    pub fn with_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&HttpRequest) -> Option<Result<Value, FetchError>> + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Delay every response, so tests can observe in-flight states
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// All requests received so far, in arrival order
    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .requests
            .clone()
    }

    /// Number of requests received for `method path`
    #[must_use]
    pub fn request_count(&self, method: HttpMethod, path: &str) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .requests
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    /// Forget recorded requests, keeping the routes
    pub fn clear_requests(&self) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .requests
            .clear();
    }

    fn answer(&self, request: &HttpRequest) -> Result<Value, FetchError> {
        let scripted = {
            let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
            inner.requests.push(request.clone());

            inner
                .routes
                .get_mut(&(request.method, request.path.clone()))
                .and_then(|queue| {
                    if queue.len() > 1 {
                        queue.pop_front()
                    } else {
                        queue.front().cloned()
                    }
                })
        };

        scripted
            .or_else(|| self.handler.as_ref().and_then(|handler| handler(request)))
            .unwrap_or_else(|| {
                Err(FetchError::Http {
                    status: 404,
                    data: Value::String(format!("no route for {request}")),
                })
            })
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("requests", &self.requests().len())
            .field("latency", &self.latency)
            .finish_non_exhaustive()
    }
}

impl HttpTransport for MockTransport {
    fn execute(
        &self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Value, FetchError>> + Send + '_>> {
        Box::pin(async move {
            if let Some(latency) = self.latency {
                tokio::time::sleep(latency).await;
            }
            self.answer(&request)
        })
    }
}
