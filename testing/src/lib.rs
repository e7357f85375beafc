//! # Todo Query Testing
//!
//! Testing utilities and helpers for todo-query.
//!
//! This crate provides:
//! - Mock implementations of Environment traits (clock, HTTP transport)
//! - A Given-When-Then harness for reducers
//! - Assertion helpers for effects
//!
//! ## Example
//!
//! ```ignore
//! use todo_query_testing::{test_clock, MockTransport};
//! use todo_query_core::http::HttpMethod;
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn loads_todos() {
//!     let transport = MockTransport::new()
//!         .respond(HttpMethod::Get, "/todos", Ok(json!([])));
//!     let app = App::with_transport(&Config::default(), Arc::new(transport), Arc::new(test_clock()))?;
//!
//!     let list = TodoList::mount(app.clone()).await?;
//!     app.wait_until_idle(Duration::from_secs(1)).await?;
//!     assert_eq!(list.view().await.content, Content::Loaded(vec![]));
//! }
//! ```

use chrono::{DateTime, Utc};
use todo_query_core::environment::Clock;

/// Scripted HTTP transport
pub mod mock_transport;

/// Given-When-Then reducer harness
pub mod reducer_test;

/// Mock implementations for testing.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use todo_query_testing::mocks::FixedClock;
    /// use todo_query_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Test helpers and utilities.
pub mod helpers {
    use tracing_subscriber::EnvFilter;

    /// Install a test-friendly tracing subscriber once per process
    ///
    /// Output goes through the test writer so it is captured unless the test fails.
    /// Later calls are no-ops.
    pub fn init_test_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .with_test_writer()
            .try_init();
    }
}

// Re-export commonly used items
pub use helpers::init_test_tracing;
pub use mock_transport::MockTransport;
pub use mocks::{FixedClock, test_clock};
pub use reducer_test::{ReducerTest, assertions};
