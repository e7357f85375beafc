//! Cache state held under an api's reducer path.

use crate::tags::Tag;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use uuid::Uuid;

/// Identity of one cached query: endpoint name plus canonical arguments
///
/// Arguments are compared by their JSON serialization, so two calls with
/// equal arguments share an entry.
///
/// ```
/// use todo_query_cache::QueryKey;
/// use serde_json::{json, Value};
///
/// let key = QueryKey::new("getToDos", &Value::Null);
/// assert_eq!(key.to_string(), "getToDos(null)");
/// assert_eq!(QueryKey::new("f", &json!({"b": 1, "a": 2})).to_string(), r#"f({"a":2,"b":1})"#);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QueryKey(String);

impl QueryKey {
    /// Key for `endpoint` called with `args`
    #[must_use]
    pub fn new(endpoint: &str, args: &Value) -> Self {
        Self(format!("{endpoint}({})", canonical(args)))
    }

    /// The key as text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// JSON text with object keys sorted at every level
fn canonical(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut fields: Vec<_> = map.iter().collect();
            fields.sort_by(|a, b| a.0.cmp(b.0));
            let body: Vec<String> = fields
                .into_iter()
                .map(|(name, field)| format!("{}:{}", Value::from(name.as_str()), canonical(field)))
                .collect();
            format!("{{{}}}", body.join(","))
        },
        Value::Array(items) => {
            let body: Vec<String> = items.iter().map(canonical).collect();
            format!("[{}]", body.join(","))
        },
        other => other.to_string(),
    }
}

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// A fresh random id
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

uuid_id!(
    /// Identifies one fetch or one mutation invocation
    RequestId
);

uuid_id!(
    /// Identifies one observer of a query
    SubscriberId
);

/// Lifecycle of a cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QueryStatus {
    /// Never requested
    #[default]
    Uninitiated,
    /// A request is in flight
    Loading,
    /// Last request succeeded
    Success,
    /// Last request failed
    Error,
}

/// Per-observer options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubscriptionOptions {
    /// Refetch this often while observed
    pub polling_interval: Option<Duration>,
}

impl SubscriptionOptions {
    /// Poll every `interval`
    #[must_use]
    pub const fn polling(interval: Duration) -> Self {
        Self {
            polling_interval: Some(interval),
        }
    }
}

/// Cached result of one query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryEntry {
    /// Endpoint name
    pub endpoint: String,
    /// Arguments the query was made with
    pub args: Value,
    /// Lifecycle state
    pub status: QueryStatus,
    /// Last successful (transformed) result; survives later failures and refetches
    pub data: Option<Value>,
    /// Last (transformed) error
    pub error: Option<Value>,
    /// Latest started fetch; results from any other request are dropped
    pub request_id: Option<RequestId>,
    /// When the latest fetch started
    pub started_at: Option<DateTime<Utc>>,
    /// When data was last stored
    pub fulfilled_at: Option<DateTime<Utc>>,
    /// Hit by an invalidation while nobody was observing
    pub invalidated: bool,
    /// Token of the scheduled removal, cleared when observed again
    pub(crate) pending_removal: Option<Uuid>,
}

impl QueryEntry {
    pub(crate) const fn new(endpoint: String, args: Value) -> Self {
        Self {
            endpoint,
            args,
            status: QueryStatus::Uninitiated,
            data: None,
            error: None,
            request_id: None,
            started_at: None,
            fulfilled_at: None,
            invalidated: false,
            pending_removal: None,
        }
    }
}

/// State of one mutation invocation
#[derive(Debug, Clone, PartialEq)]
pub struct MutationEntry {
    /// Endpoint name
    pub endpoint: String,
    /// Arguments sent
    pub args: Value,
    /// `Loading`, then `Success` or `Error`
    pub status: QueryStatus,
    /// Response body on success
    pub data: Option<Value>,
    /// Transformed error on failure
    pub error: Option<Value>,
    /// When the mutation was issued
    pub started_at: DateTime<Utc>,
    /// When it settled
    pub fulfilled_at: Option<DateTime<Utc>>,
}

/// Everything one api keeps in the root state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiState {
    /// Query entries by key
    pub queries: BTreeMap<QueryKey, QueryEntry>,
    /// Mutation entries by invocation
    pub mutations: BTreeMap<RequestId, MutationEntry>,
    /// Observers per query
    pub subscriptions: BTreeMap<QueryKey, BTreeMap<SubscriberId, SubscriptionOptions>>,
    /// Tag index: which queries currently provide each tag
    pub provided: BTreeMap<Tag, BTreeSet<QueryKey>>,
}

impl ApiState {
    /// Entry for `key`, if cached
    #[must_use]
    pub fn query(&self, key: &QueryKey) -> Option<&QueryEntry> {
        self.queries.get(key)
    }

    /// Entry for a mutation invocation
    #[must_use]
    pub fn mutation(&self, request_id: &RequestId) -> Option<&MutationEntry> {
        self.mutations.get(request_id)
    }

    /// Number of observers of `key`
    #[must_use]
    pub fn subscriber_count(&self, key: &QueryKey) -> usize {
        self.subscriptions.get(key).map_or(0, BTreeMap::len)
    }

    /// Shortest polling interval requested by any observer of `key`
    #[must_use]
    pub fn polling_interval(&self, key: &QueryKey) -> Option<Duration> {
        self.subscriptions
            .get(key)?
            .values()
            .filter_map(|options| options.polling_interval)
            .min()
    }

    /// Queries providing a tag that `invalidated` hits
    #[must_use]
    pub fn keys_invalidated_by(&self, invalidated: &[Tag]) -> BTreeSet<QueryKey> {
        self.provided
            .iter()
            .filter(|(provided, _)| invalidated.iter().any(|tag| tag.invalidates(provided)))
            .flat_map(|(_, keys)| keys.iter().cloned())
            .collect()
    }

    /// Replace the tags `key` provides
    pub(crate) fn set_provided_tags(&mut self, key: &QueryKey, tags: Vec<Tag>) {
        self.remove_provided_tags(key);
        for tag in tags {
            self.provided.entry(tag).or_default().insert(key.clone());
        }
    }

    /// Drop every tag index row pointing at `key`
    pub(crate) fn remove_provided_tags(&mut self, key: &QueryKey) {
        self.provided.retain(|_, keys| {
            keys.remove(key);
            !keys.is_empty()
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tag_index_replaces_rows() {
        let mut state = ApiState::default();
        let key = QueryKey::new("getToDos", &Value::Null);

        state.set_provided_tags(&key, vec![Tag::kind("Todos"), Tag::with_id("Todos", 1)]);
        state.set_provided_tags(&key, vec![Tag::kind("Todos")]);

        assert_eq!(state.provided.len(), 1);
        assert!(state.keys_invalidated_by(&[Tag::with_id("Todos", 9)]).contains(&key));

        state.remove_provided_tags(&key);
        assert!(state.provided.is_empty());
    }

    #[test]
    fn polling_interval_is_shortest() {
        let mut state = ApiState::default();
        let key = QueryKey::new("getToDos", &json!(null));
        let observers = state.subscriptions.entry(key.clone()).or_default();
        observers.insert(SubscriberId::new(), SubscriptionOptions::polling(Duration::from_secs(5)));
        observers.insert(SubscriberId::new(), SubscriptionOptions::default());
        observers.insert(SubscriberId::new(), SubscriptionOptions::polling(Duration::from_secs(2)));

        assert_eq!(state.polling_interval(&key), Some(Duration::from_secs(2)));
        assert_eq!(state.subscriber_count(&key), 3);
    }

    proptest::proptest! {
        #[test]
        fn key_ignores_field_order(fields in proptest::collection::btree_map("[a-z]{1,6}", proptest::num::i64::ANY, 0..8)) {
            let forward: serde_json::Map<String, Value> =
                fields.iter().map(|(k, v)| (k.clone(), json!(v))).collect();
            let reversed: serde_json::Map<String, Value> =
                fields.iter().rev().map(|(k, v)| (k.clone(), json!(v))).collect();

            let a = QueryKey::new("getToDo", &json!({ "filter": Value::Object(forward) }));
            let b = QueryKey::new("getToDo", &json!({ "filter": Value::Object(reversed) }));
            proptest::prop_assert_eq!(a, b);
        }
    }
}
