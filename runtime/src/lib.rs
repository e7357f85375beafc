//! # Todo Query Runtime
//!
//! Runtime implementation for the todo-query architecture.
//!
//! This crate provides the Store runtime that coordinates reducer execution
//! and effect handling.
//!
//! ## Core Components
//!
//! - **Store**: The runtime that manages state and executes effects
//! - **Effect Executor**: Executes effect descriptions (delays, HTTP requests)
//!   and feeds resulting actions back to the reducer
//! - **Change notifications**: Observers are told every time the state changes,
//!   which is what lets a view re-render without awaiting network calls
//!
//! ## Example
//!
//! ```ignore
//! use todo_query_runtime::Store;
//!
//! let store = Store::new(initial_state, my_reducer, environment);
//!
//! // Send an action
//! store.send(Action::DoSomething).await?;
//!
//! // Read state
//! let value = store.state(|s| s.some_field.clone()).await;
//! ```

use std::sync::Arc;
use tokio::sync::RwLock;
use todo_query_core::{effect::Effect, reducer::Reducer};

/// Prometheus metrics for observability
pub mod metrics;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// Timeout waiting for effects to settle
        #[error("Timeout waiting for store")]
        Timeout,
    }
}

pub use error::StoreError;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Guard that decrements the pending-effect counter on drop, even if the effect panics
struct AtomicCounterGuard(Arc<AtomicUsize>);

impl Drop for AtomicCounterGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Store runtime for coordinating reducer execution and effect handling.
pub mod store {
    use super::{
        Arc, AtomicBool, AtomicCounterGuard, AtomicUsize, Duration, Effect, Ordering, Reducer,
        RwLock, StoreError,
    };
    use todo_query_core::effect::HttpOperation;
    use tokio::sync::watch;

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock` for concurrent access)
    /// 2. Reducer (state transitions)
    /// 3. Environment (injected dependencies)
    /// 4. Effect execution (with feedback loop)
    ///
    /// State is only ever mutated by the reducer, inside [`Store::send`].
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: R,
        environment: E,
        shutdown: Arc<AtomicBool>,
        pending_effects: Arc<AtomicUsize>,
        /// Bumped after every reduction; observers re-read state when it changes.
        version: Arc<watch::Sender<u64>>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            let (version, _) = watch::channel(0);

            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer,
                environment,
                shutdown: Arc::new(AtomicBool::new(false)),
                pending_effects: Arc::new(AtomicUsize::new(0)),
                version: Arc::new(version),
            }
        }

        /// Number of effects currently running across all actions
        #[must_use]
        pub fn pending_effects(&self) -> usize {
            self.pending_effects.load(Ordering::Acquire)
        }

        /// Initiate graceful shutdown of the store
        ///
        /// Sets the shutdown flag (rejecting new actions), then waits for pending
        /// effects to complete.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if the timeout expires before all
        /// pending effects complete.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!("Initiating graceful shutdown");
            metrics::counter!("store.shutdown.initiated").increment(1);

            self.shutdown.store(true, Ordering::Release);

            match self.wait_until_idle(timeout).await {
                Ok(()) => {
                    tracing::info!("All effects completed, shutdown successful");
                    metrics::counter!("store.shutdown.completed").increment(1);
                    Ok(())
                },
                Err(_) => {
                    let pending = self.pending_effects();
                    tracing::error!(pending_effects = pending, "Shutdown timeout");
                    metrics::counter!("store.shutdown.timeout").increment(1);
                    Err(StoreError::ShutdownTimeout(pending))
                },
            }
        }

        /// Wait until no effect is running anywhere in the store
        ///
        /// Delayed effects count as running until they fire.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::Timeout`] if effects are still running when the
        /// timeout expires.
        pub async fn wait_until_idle(&self, timeout: Duration) -> Result<(), StoreError> {
            let poll_interval = Duration::from_millis(5);

            tokio::time::timeout(timeout, async {
                loop {
                    let pending = self.pending_effects.load(Ordering::Acquire);
                    if pending == 0 {
                        return;
                    }
                    tracing::trace!(pending_effects = pending, "Waiting for effects to complete");
                    tokio::time::sleep(poll_interval).await;
                }
            })
            .await
            .map_err(|_| StoreError::Timeout)
        }

        /// Send an action to the store
        ///
        /// 1. Acquires write lock on state
        /// 2. Calls reducer with (state, action, environment)
        /// 3. Notifies state observers
        /// 4. Starts the returned effects; they may feed actions back later
        ///
        /// `send()` returns after starting effect execution, not completion.
        /// Use [`Store::wait_until_idle`] to wait for the effects to settle.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<(), StoreError>
        where
            R: Clone,
            E: Clone,
        {
            if self.shutdown.load(Ordering::Acquire) {
                tracing::warn!("Rejected action: store is shutting down");
                metrics::counter!("store.shutdown.rejected_actions").increment(1);
                return Err(StoreError::ShutdownInProgress);
            }

            tracing::debug!("Processing action");
            metrics::counter!("store.commands.total").increment(1);

            let effects = {
                let mut state = self.state.write().await;
                tracing::trace!("Acquired write lock on state");

                let span = tracing::debug_span!("reducer_execution");
                let _enter = span.enter();

                let start = std::time::Instant::now();
                let effects = self.reducer.reduce(&mut *state, action, &self.environment);
                metrics::histogram!("store.reducer.duration_seconds")
                    .record(start.elapsed().as_secs_f64());

                tracing::trace!("Reducer completed, returned {} effects", effects.len());

                // Note: Precision loss acceptable for metrics (effect counts < 2^52)
                #[allow(clippy::cast_precision_loss)]
                metrics::histogram!("store.effects.count").record(effects.len() as f64);

                effects
            };

            self.version.send_modify(|version| *version = version.wrapping_add(1));

            for effect in effects {
                self.execute_effect_internal(effect);
            }

            Ok(())
        }

        /// Subscribe to state changes
        ///
        /// The receiver's value is a monotonically increasing version number;
        /// `changed().await` resolves after the next reduction.
        #[must_use]
        pub fn subscribe_state(&self) -> watch::Receiver<u64> {
            self.version.subscribe()
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let todo_count = store.state(|s| s.todos.len()).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&*state)
        }

        /// Register an effect as running, returning a guard that releases it on drop
        fn track(&self) -> AtomicCounterGuard {
            self.pending_effects.fetch_add(1, Ordering::SeqCst);
            AtomicCounterGuard(Arc::clone(&self.pending_effects))
        }

        /// Feed an effect-produced action back into the store
        async fn feed_back(&self, action: A)
        where
            R: Clone,
            E: Clone,
        {
            if let Err(error) = self.send(action).await {
                tracing::debug!(error = %error, "Dropped effect action");
            }
        }

        /// Execute an effect with tracking
        ///
        /// # Error Handling Strategy
        ///
        /// **Reducer panics**: Propagate (fail fast).
        ///
        /// **Effect execution failures**: Log and continue. A panicking effect task
        /// is isolated by `tokio::spawn`; the guard keeps the counter correct.
        #[tracing::instrument(skip(self, effect), name = "execute_effect")]
        fn execute_effect_internal(&self, effect: Effect<A>)
        where
            R: Clone,
            E: Clone,
        {
            match effect {
                Effect::None => {
                    tracing::trace!("Executing Effect::None (no-op)");
                    metrics::counter!("store.effects.executed", "type" => "none").increment(1);
                },
                Effect::Delay { duration, action } => {
                    tracing::trace!("Executing Effect::Delay (duration: {:?})", duration);
                    metrics::counter!("store.effects.executed", "type" => "delay").increment(1);
                    let guard = self.track();
                    let store = self.clone();

                    tokio::spawn(async move {
                        let _guard = guard;

                        tokio::time::sleep(duration).await;
                        tracing::trace!("Effect::Delay completed, sending action");
                        store.feed_back(*action).await;
                    });
                },
                Effect::Http(op) => {
                    metrics::counter!("store.effects.executed", "type" => "http").increment(1);
                    let guard = self.track();
                    let store = self.clone();

                    tokio::spawn(async move {
                        let _guard = guard;

                        let HttpOperation {
                            transport,
                            request,
                            on_success,
                            on_error,
                        } = op;
                        let method = request.method;
                        let path = request.path.clone();
                        tracing::debug!(%method, path = %path, "Executing http request");

                        let start = std::time::Instant::now();
                        let result = transport.execute(request).await;
                        crate::metrics::HttpMetrics::record_request(start.elapsed());

                        let action = match result {
                            Ok(body) => {
                                tracing::debug!(%method, path = %path, "http request succeeded");
                                on_success(body)
                            },
                            Err(error) => {
                                tracing::warn!(%method, path = %path, error = %error, "http request failed");
                                crate::metrics::HttpMetrics::record_failure();
                                on_error(error)
                            },
                        };

                        if let Some(action) = action {
                            store.feed_back(action).await;
                        } else {
                            tracing::trace!("Http effect completed with no action");
                        }
                    });
                },
            }
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone,
        E: Clone,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: self.reducer.clone(),
                environment: self.environment.clone(),
                shutdown: Arc::clone(&self.shutdown),
                pending_effects: Arc::clone(&self.pending_effects),
                version: Arc::clone(&self.version),
            }
        }
    }
}

// Re-export for convenience
pub use store::Store;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)] // Test code can use unwrap/panic
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::future::Future;
    use std::pin::Pin;
    use todo_query_core::http::{FetchError, HttpRequest, HttpTransport};
    use todo_query_core::{delay, fetch, smallvec, SmallVec};

    #[derive(Debug, Clone)]
    struct TestState {
        value: i32,
        bodies: Vec<Value>,
        last_error: Option<String>,
    }

    #[derive(Debug, Clone)]
    enum TestAction {
        Increment,
        Decrement,
        NoOp,
        ProduceDelayedAction,
        ProduceSlowAction,
        ProduceSeveralDelays,
        Fetch(String),
        Fetched(Value),
        FetchFailed(String),
    }

    struct StaticTransport;

    impl HttpTransport for StaticTransport {
        fn execute(
            &self,
            request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<Value, FetchError>> + Send + '_>> {
            Box::pin(async move {
                match request.path.as_str() {
                    "/todos" => Ok(json!([{ "id": 1 }])),
                    "/panic" => panic!("Intentional panic in transport for testing"),
                    _ => Err(FetchError::Http {
                        status: 404,
                        data: Value::Null,
                    }),
                }
            })
        }
    }

    #[derive(Clone)]
    struct TestEnv {
        transport: Arc<dyn HttpTransport>,
    }

    #[derive(Debug, Clone)]
    struct TestReducer;

    impl Reducer for TestReducer {
        type State = TestState;
        type Action = TestAction;
        type Environment = TestEnv;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                TestAction::Increment => {
                    state.value += 1;
                    smallvec![Effect::None]
                },
                TestAction::Decrement => {
                    state.value -= 1;
                    smallvec![Effect::None]
                },
                TestAction::NoOp => smallvec![Effect::None],
                TestAction::ProduceDelayedAction => smallvec![delay! {
                    duration: Duration::from_millis(10),
                    action: TestAction::Increment
                }],
                TestAction::ProduceSlowAction => smallvec![delay! {
                    duration: Duration::from_secs(60),
                    action: TestAction::Increment
                }],
                TestAction::ProduceSeveralDelays => smallvec![
                    delay! { duration: Duration::from_millis(15), action: TestAction::Increment },
                    delay! { duration: Duration::from_millis(5), action: TestAction::Increment },
                    delay! { duration: Duration::from_millis(10), action: TestAction::Decrement },
                ],
                TestAction::Fetch(path) => smallvec![fetch! {
                    transport: env.transport,
                    request: HttpRequest::get(path),
                    on_success: |body| Some(TestAction::Fetched(body)),
                    on_error: |error| Some(TestAction::FetchFailed(error.to_string()))
                }],
                TestAction::Fetched(body) => {
                    state.bodies.push(body);
                    SmallVec::new()
                },
                TestAction::FetchFailed(error) => {
                    state.last_error = Some(error);
                    SmallVec::new()
                },
            }
        }
    }

    fn test_store() -> Store<TestState, TestAction, TestEnv, TestReducer> {
        let state = TestState {
            value: 0,
            bodies: Vec::new(),
            last_error: None,
        };
        let env = TestEnv {
            transport: Arc::new(StaticTransport),
        };
        Store::new(state, TestReducer, env)
    }

    #[tokio::test]
    async fn test_send_action() {
        let store = test_store();

        store.send(TestAction::Increment).await.unwrap();
        store.send(TestAction::Increment).await.unwrap();
        store.send(TestAction::Decrement).await.unwrap();
        store.send(TestAction::NoOp).await.unwrap();

        assert_eq!(store.state(|s| s.value).await, 1);
        assert_eq!(store.pending_effects(), 0);
    }

    #[tokio::test]
    async fn test_effect_delay() {
        let store = test_store();

        store.send(TestAction::ProduceDelayedAction).await.unwrap();
        assert_eq!(store.state(|s| s.value).await, 0);
        assert_eq!(store.pending_effects(), 1);

        store.wait_until_idle(Duration::from_secs(1)).await.unwrap();
        assert_eq!(store.state(|s| s.value).await, 1);
    }

    #[tokio::test]
    async fn test_every_returned_effect_runs() {
        let store = test_store();

        store.send(TestAction::ProduceSeveralDelays).await.unwrap();
        assert_eq!(store.pending_effects(), 3);
        store.wait_until_idle(Duration::from_secs(1)).await.unwrap();

        // +1 +1 -1
        assert_eq!(store.state(|s| s.value).await, 1);
    }

    #[tokio::test]
    async fn test_wait_until_idle_times_out_on_pending_timer() {
        let store = test_store();

        store.send(TestAction::ProduceSlowAction).await.unwrap();

        let result = store.wait_until_idle(Duration::from_millis(20)).await;
        assert!(matches!(result, Err(StoreError::Timeout)));
        assert_eq!(store.state(|s| s.value).await, 0);
    }

    #[tokio::test]
    async fn test_http_effect_feeds_back_body() {
        let store = test_store();

        store.send(TestAction::Fetch("/todos".into())).await.unwrap();
        store.wait_until_idle(Duration::from_secs(1)).await.unwrap();

        let bodies = store.state(|s| s.bodies.clone()).await;
        assert_eq!(bodies, vec![json!([{ "id": 1 }])]);
    }

    #[tokio::test]
    async fn test_http_effect_feeds_back_error() {
        let store = test_store();

        store.send(TestAction::Fetch("/missing".into())).await.unwrap();
        store.wait_until_idle(Duration::from_secs(1)).await.unwrap();

        let error = store.state(|s| s.last_error.clone()).await;
        assert_eq!(error.as_deref(), Some("HTTP 404: null"));
    }

    #[tokio::test]
    async fn test_state_subscription_sees_every_reduction() {
        let store = test_store();
        let mut changes = store.subscribe_state();
        let before = *changes.borrow_and_update();

        store.send(TestAction::Increment).await.unwrap();
        changes.changed().await.unwrap();

        assert_eq!(*changes.borrow(), before + 1);
    }

    #[tokio::test]
    async fn test_concurrent_sends() {
        let store = test_store();

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    let _ = store.send(TestAction::Increment).await;
                })
            })
            .collect();

        for handle in handles {
            if let Err(e) = handle.await {
                panic!("concurrent send task panicked: {e}");
            }
        }

        assert_eq!(store.state(|s| s.value).await, 10);
    }

    #[tokio::test]
    async fn test_concurrent_fetches_all_feed_back() {
        let store = test_store();

        for _ in 0..5 {
            store.send(TestAction::Fetch("/todos".into())).await.unwrap();
        }
        store.wait_until_idle(Duration::from_secs(1)).await.unwrap();

        assert_eq!(store.state(|s| s.bodies.len()).await, 5);
    }

    #[tokio::test]
    async fn test_effect_panic_isolation() {
        let store = test_store();

        store.send(TestAction::Fetch("/panic".into())).await.unwrap();
        store.wait_until_idle(Duration::from_secs(1)).await.unwrap();

        // Store still works after a panicking effect
        store.send(TestAction::Increment).await.unwrap();
        assert_eq!(store.state(|s| s.value).await, 1);
        assert_eq!(store.pending_effects(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_times_out_with_pending_delay() {
        let store = test_store();
        store.send(TestAction::ProduceSlowAction).await.unwrap();

        let result = store.shutdown(Duration::from_millis(20)).await;

        assert!(matches!(result, Err(StoreError::ShutdownTimeout(1))));
    }

    #[tokio::test]
    async fn test_shutdown_rejects_new_actions() {
        let store = test_store();

        store.shutdown(Duration::from_secs(1)).await.unwrap();

        let result = store.send(TestAction::Increment).await;
        assert!(matches!(result, Err(StoreError::ShutdownInProgress)));
    }
}
