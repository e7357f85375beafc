//! Actions understood by the api reducer.

use crate::state::{QueryKey, RequestId, SubscriberId, SubscriptionOptions};
use crate::tags::Tag;
use serde_json::Value;
use uuid::Uuid;

/// Inputs to an [`ApiReducer`](crate::ApiReducer)
///
/// Commands come from the application; `*Fulfilled` / `*Rejected` and the timer
/// actions are fed back by effects the reducer itself returned.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiAction {
    /// Start observing a query, fetching it if needed
    Subscribe {
        /// Endpoint name
        endpoint: String,
        /// Query arguments
        args: Value,
        /// Observer identity
        subscriber: SubscriberId,
        /// Observer options
        options: SubscriptionOptions,
    },
    /// Stop observing a query
    Unsubscribe {
        /// Query
        key: QueryKey,
        /// Observer identity
        subscriber: SubscriberId,
    },
    /// Fetch a query again unless a fetch is in flight
    Refetch {
        /// Query
        key: QueryKey,
    },
    /// A query fetch succeeded
    QueryFulfilled {
        /// Query
        key: QueryKey,
        /// The fetch that produced this result
        request_id: RequestId,
        /// Transformed response
        data: Value,
    },
    /// A query fetch failed
    QueryRejected {
        /// Query
        key: QueryKey,
        /// The fetch that produced this error
        request_id: RequestId,
        /// Transformed error
        error: Value,
    },
    /// Run a mutation
    Mutate {
        /// Caller-chosen identity of this invocation
        request_id: RequestId,
        /// Endpoint name
        endpoint: String,
        /// Mutation arguments
        args: Value,
    },
    /// A mutation succeeded
    MutationFulfilled {
        /// Invocation
        request_id: RequestId,
        /// Transformed response
        data: Value,
    },
    /// A mutation failed
    MutationRejected {
        /// Invocation
        request_id: RequestId,
        /// Transformed error
        error: Value,
    },
    /// Mark every query providing one of these tags as stale
    InvalidateTags(Vec<Tag>),
    /// Polling timer fired
    PollTick {
        /// Query
        key: QueryKey,
        /// The fetch the timer was scheduled after
        request_id: RequestId,
    },
    /// Grace period after the last observer left has expired
    RemoveUnused {
        /// Query
        key: QueryKey,
        /// Removal token; stale if the query was observed again meanwhile
        token: Uuid,
    },
    /// Retention period of a settled mutation has expired
    RemoveMutation {
        /// Invocation
        request_id: RequestId,
    },
    /// Drop the whole cache
    ResetApiState,
}
