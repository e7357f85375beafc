//! # Todo Query Core
//!
//! Core traits and types for the todo-query architecture.
//!
//! This crate provides the fundamental abstractions for building a client whose
//! state is split between a server-derived cache and local UI state, using the
//! Reducer pattern.
//!
//! ## Core Concepts
//!
//! - **State**: Domain state for a slice (cache entries, text-box contents)
//! - **Action**: All possible inputs to a reducer (user commands, fetch results)
//! - **Reducer**: Pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Side effect descriptions (not execution)
//! - **Environment**: Injected dependencies via traits (clock, HTTP transport)
//!
//! ## Architecture Principles
//!
//! - Functional Core, Imperative Shell
//! - Unidirectional Data Flow
//! - Explicit Effects (no hidden I/O)
//! - Dependency Injection via Environment
//!
//! ## Example
//!
//! ```
//! use todo_query_core::{effect::Effect, reducer::Reducer, SmallVec};
//!
//! #[derive(Clone, Debug, Default)]
//! struct TextBoxState {
//!     text: String,
//! }
//!
//! #[derive(Clone, Debug)]
//! enum TextBoxAction {
//!     Set(String),
//! }
//!
//! struct TextBoxReducer;
//!
//! impl Reducer for TextBoxReducer {
//!     type State = TextBoxState;
//!     type Action = TextBoxAction;
//!     type Environment = ();
//!
//!     fn reduce(
//!         &self,
//!         state: &mut TextBoxState,
//!         action: TextBoxAction,
//!         _env: &(),
//!     ) -> SmallVec<[Effect<TextBoxAction>; 4]> {
//!         match action {
//!             TextBoxAction::Set(text) => state.text = text,
//!         }
//!         SmallVec::new()
//!     }
//! }
//!
//! let mut state = TextBoxState::default();
//! let _ = TextBoxReducer.reduce(&mut state, TextBoxAction::Set("milk".into()), &());
//! assert_eq!(state.text, "milk");
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{smallvec, SmallVec};

/// Reducer composition utilities
pub mod composition;

/// Declarative macros for effect construction
pub mod effect_macros;

/// HTTP transport abstraction and fetch errors
pub mod http;

/// Reducer module - The core trait for business logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`
///
/// They contain all state transition logic and are deterministic and testable.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// This is a pure function that:
        /// 1. Updates state in place
        /// 2. Returns effect descriptions to be executed
        ///
        /// # Returns
        ///
        /// Effects to be executed by the runtime. Most reducers produce at most
        /// a handful, hence the inline capacity.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe side effects to be performed by the runtime.
/// They are values (not execution) and are composable.
pub mod effect {
    use crate::http::{FetchError, HttpRequest, HttpTransport};
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;

    /// Callback invoked with the decoded response body of a successful request
    pub type OnSuccess<Action> = Box<dyn FnOnce(Value) -> Option<Action> + Send>;

    /// Callback invoked with the transport error of a failed request
    pub type OnError<Action> = Box<dyn FnOnce(FetchError) -> Option<Action> + Send>;

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should happen,
    /// returned from reducers and executed by the Store runtime.
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Delayed action (polling, cache expiry)
        Delay {
            /// How long to wait
            duration: Duration,
            /// Action to dispatch after delay
            action: Box<Action>,
        },

        /// A single HTTP request against the injected transport
        Http(HttpOperation<Action>),
    }

    /// An HTTP request to run, plus the callbacks that turn its outcome into an action
    pub struct HttpOperation<Action> {
        /// Transport the request is executed on
        pub transport: Arc<dyn HttpTransport>,
        /// The request itself
        pub request: HttpRequest,
        /// Called with the response body on a 2xx answer
        pub on_success: OnSuccess<Action>,
        /// Called with the error on anything else
        pub on_error: OnError<Action>,
    }

    // Manual Debug implementation since the HTTP callbacks don't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Delay { duration, action } => f
                    .debug_struct("Effect::Delay")
                    .field("duration", duration)
                    .field("action", action)
                    .finish(),
                Effect::Http(op) => f
                    .debug_struct("Effect::Http")
                    .field("request", &op.request)
                    .finish_non_exhaustive(),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Returns the HTTP request this effect describes, if it is one
        #[must_use]
        pub const fn as_http_request(&self) -> Option<&HttpRequest> {
            match self {
                Effect::Http(op) => Some(&op.request),
                _ => None,
            }
        }

        /// Transform every action this effect may produce
        ///
        /// Used to lift a child reducer's effects into a parent action type.
        #[must_use]
        pub fn map<B, F>(self, f: F) -> Effect<B>
        where
            F: Fn(Action) -> B + Send + Sync + 'static,
            Action: Send + 'static,
            B: Send + 'static,
        {
            self.map_shared(Arc::new(f))
        }

        fn map_shared<B>(self, f: Arc<dyn Fn(Action) -> B + Send + Sync>) -> Effect<B>
        where
            Action: Send + 'static,
            B: Send + 'static,
        {
            match self {
                Effect::None => Effect::None,
                Effect::Delay { duration, action } => Effect::Delay {
                    duration,
                    action: Box::new(f(*action)),
                },
                Effect::Http(op) => {
                    let HttpOperation {
                        transport,
                        request,
                        on_success,
                        on_error,
                    } = op;
                    let f_err = Arc::clone(&f);
                    Effect::Http(HttpOperation {
                        transport,
                        request,
                        on_success: Box::new(move |value| on_success(value).map(|a| f(a))),
                        on_error: Box::new(move |error| on_error(error).map(|a| f_err(a))),
                    })
                },
            }
        }
    }
}

/// Environment module - Dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected
/// via the Environment parameter.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use todo_query_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let earlier = clock.now();
    /// assert!(clock.now() >= earlier);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
