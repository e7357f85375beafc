//! Typed views over cache entries.
//!
//! Entries store JSON; selectors decode it into the caller's types and expose
//! the derived flags views branch on.

use crate::state::{ApiState, QueryKey, QueryStatus, RequestId};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

/// Typed snapshot of one query entry
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult<T> {
    /// Lifecycle state
    pub status: QueryStatus,
    /// Last successful data (kept across refetches and failures)
    pub data: Option<T>,
    /// Last error, raw JSON as stored
    pub error: Option<Value>,
}

impl<T> QueryResult<T> {
    /// No fetch was ever started
    #[must_use]
    pub fn is_uninitiated(&self) -> bool {
        self.status == QueryStatus::Uninitiated
    }

    /// First load: a fetch is in flight and there is nothing to show yet
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading && self.data.is_none()
    }

    /// Any fetch is in flight, including refetches of cached data
    #[must_use]
    pub fn is_fetching(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    /// Last fetch succeeded
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    /// Last fetch failed
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }
}

impl<T> Default for QueryResult<T> {
    fn default() -> Self {
        Self {
            status: QueryStatus::Uninitiated,
            data: None,
            error: None,
        }
    }
}

/// Typed snapshot of one mutation invocation
#[derive(Debug, Clone, PartialEq)]
pub struct MutationResult<T> {
    /// Lifecycle state
    pub status: QueryStatus,
    /// Response on success
    pub data: Option<T>,
    /// Error on failure, raw JSON as stored
    pub error: Option<Value>,
}

impl<T> MutationResult<T> {
    /// Not issued (or already dropped by a reset)
    #[must_use]
    pub fn is_uninitiated(&self) -> bool {
        self.status == QueryStatus::Uninitiated
    }

    /// In flight
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    /// Succeeded
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    /// Failed
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }
}

/// Decode stored data, turning a shape mismatch into a parsing error
fn decode<T: DeserializeOwned>(
    status: QueryStatus,
    data: Option<&Value>,
    error: Option<&Value>,
) -> (QueryStatus, Option<T>, Option<Value>) {
    match data.map(|value| serde_json::from_value::<T>(value.clone())) {
        Some(Ok(decoded)) => (status, Some(decoded), error.cloned()),
        Some(Err(decode_error)) => {
            tracing::warn!(error = %decode_error, "Cached data does not match the requested type");
            (
                QueryStatus::Error,
                None,
                Some(json!({ "status": "PARSING_ERROR", "error": decode_error.to_string() })),
            )
        },
        None => (status, None, error.cloned()),
    }
}

/// Select a query entry as `T`
///
/// A missing entry reads as uninitiated.
#[must_use]
pub fn select_query<T: DeserializeOwned>(state: &ApiState, key: &QueryKey) -> QueryResult<T> {
    let Some(entry) = state.query(key) else {
        return QueryResult::default();
    };
    let (status, data, error) = decode(entry.status, entry.data.as_ref(), entry.error.as_ref());
    QueryResult {
        status,
        data,
        error,
    }
}

/// Select a mutation invocation as `T`
#[must_use]
pub fn select_mutation<T: DeserializeOwned>(
    state: &ApiState,
    request_id: &RequestId,
) -> MutationResult<T> {
    let Some(entry) = state.mutation(request_id) else {
        return MutationResult {
            status: QueryStatus::Uninitiated,
            data: None,
            error: None,
        };
    };
    let (status, data, error) = decode(entry.status, entry.data.as_ref(), entry.error.as_ref());
    MutationResult {
        status,
        data,
        error,
    }
}
