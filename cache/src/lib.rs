//! # Todo Query Cache
//!
//! Remote data cache for the todo-query architecture.
//!
//! An [`Api`] declares named endpoints. Queries are cached per endpoint and
//! arguments, deduplicated while in flight, and tagged; mutations invalidate
//! tags, which refetches every observed query that provided them. All of this
//! is plain reducer logic in [`ApiReducer`]; the network is reached only through
//! `Effect::Http` values the store executes.
//!
//! ## Example
//!
//! ```ignore
//! use todo_query_cache::{Api, ApiAction, ApiReducer, EndpointDefinition, SubscriberId, Tag};
//!
//! let api = Arc::new(
//!     Api::builder("api")
//!         .tag_types(["Todos"])
//!         .endpoint(
//!             "getToDos",
//!             EndpointDefinition::query(|_| HttpRequest::get("/todos"))
//!                 .provides_tags(|_, _| vec![Tag::kind("Todos")]),
//!         )
//!         .build()?,
//! );
//!
//! let store = Store::new(ApiState::default(), ApiReducer::new(api), environment);
//! store.send(ApiAction::Subscribe {
//!     endpoint: "getToDos".into(),
//!     args: Value::Null,
//!     subscriber: SubscriberId::new(),
//!     options: SubscriptionOptions::default(),
//! }).await?;
//! ```

/// Actions understood by the api reducer
pub mod action;

/// Api and endpoint definitions
pub mod api;

/// Error types
pub mod error;

/// The api reducer
pub mod reducer;

/// Typed selectors
pub mod selectors;

/// Cache state
pub mod state;

/// Cache tags
pub mod tags;

/// `reqwest` transport
pub mod transport;

pub use action::ApiAction;
pub use api::{Api, ApiBuilder, EndpointDefinition, EndpointKind, DEFAULT_KEEP_UNUSED_DATA_FOR};
pub use error::CacheError;
pub use reducer::{ApiEnvironment, ApiReducer};
pub use selectors::{select_mutation, select_query, MutationResult, QueryResult};
pub use state::{
    ApiState, MutationEntry, QueryEntry, QueryKey, QueryStatus, RequestId, SubscriberId,
    SubscriptionOptions,
};
pub use tags::Tag;
pub use transport::ReqwestTransport;
