//! Prometheus metrics for observability and monitoring.
//!
//! This module exports the metrics recorded across the workspace:
//! - Store action processing and reducer timing
//! - Effect execution by kind
//! - HTTP request latency and failures
//! - Query cache fetches, hits, invalidations and evictions
//!
//! # Example
//!
//! ```rust,no_run
//! use todo_query_runtime::metrics::MetricsServer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Start metrics server on port 9090
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//!
//! // Metrics available at http://localhost:9090/metrics
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, gauge, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
}

/// Prometheus metrics server.
///
/// Exposes metrics on an HTTP endpoint for Prometheus scraping.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a new metrics server.
    ///
    /// # Arguments
    ///
    /// * `addr` - Socket address to bind to (e.g., `0.0.0.0:9090`)
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Address the scrape endpoint listens on
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Install the global recorder and spawn the scrape listener.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built.
    ///
    /// # Note
    ///
    /// If a metrics recorder is already installed (e.g., in tests), this logs a
    /// warning and leaves the existing recorder in place.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let (recorder, exporter) = PrometheusBuilder::new()
            .with_http_listener(self.addr)
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[
                    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?
            .build()
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        let handle = recorder.handle();
        if metrics::set_global_recorder(recorder).is_err() {
            tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
            return Ok(());
        }
        self.handle = Some(handle);

        let addr = self.addr;
        tokio::spawn(async move {
            if exporter.await.is_err() {
                tracing::error!(addr = %addr, "Metrics listener stopped");
            }
        });

        tracing::info!(
            addr = %self.addr,
            "Metrics server started - available at http://{}/metrics",
            self.addr
        );
        Ok(())
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if server hasn't been started.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    // Store
    describe_counter!("store.commands.total", "Total number of actions sent to stores");
    describe_histogram!(
        "store.reducer.duration_seconds",
        "Time taken to run the root reducer for one action"
    );
    describe_histogram!("store.effects.count", "Effects returned per reduction");
    describe_counter!("store.effects.executed", "Effects executed, labelled by kind");
    describe_counter!(
        "store.shutdown.rejected_actions",
        "Actions rejected because the store was shutting down"
    );

    // HTTP
    describe_histogram!("store.http.duration_seconds", "Latency of HTTP effects");
    describe_counter!("store.http.failures", "HTTP effects that ended in a fetch error");

    // Query cache
    describe_counter!("query.fetch.started", "Query fetches started, labelled by endpoint");
    describe_counter!("query.cache.hits", "Subscriptions served from an existing entry");
    describe_counter!("query.fetch.fulfilled", "Query fetches that stored new data");
    describe_counter!("query.fetch.rejected", "Query fetches that stored an error");
    describe_counter!("query.fetch.stale", "Query results dropped because a newer fetch started");
    describe_counter!("query.invalidations", "Cache entries hit by tag invalidation");
    describe_counter!("query.evictions", "Unobserved cache entries removed");
    describe_gauge!("query.entries", "Query entries currently held by the cache");
    describe_counter!("mutation.started", "Mutations started, labelled by endpoint");
    describe_counter!("mutation.failed", "Mutations that ended in a fetch error");
    describe_counter!("mutation.evictions", "Settled mutations forgotten after the retention period");
}

/// HTTP metrics recorder.
pub struct HttpMetrics;

impl HttpMetrics {
    /// Record how long a request took.
    pub fn record_request(duration: Duration) {
        histogram!("store.http.duration_seconds").record(duration.as_secs_f64());
    }

    /// Record a failed request.
    pub fn record_failure() {
        counter!("store.http.failures").increment(1);
    }
}
