//! API slice and endpoint definitions.
//!
//! An [`Api`] is a named table of endpoints sharing one cache namespace. Each
//! [`EndpointDefinition`] says how to turn arguments into an [`HttpRequest`],
//! how to shape the response before it is cached, and which tags it provides
//! (queries) or invalidates (mutations).

use crate::error::CacheError;
use crate::tags::Tag;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use todo_query_core::http::{FetchError, HttpRequest};

/// How long an unobserved query entry survives before removal
pub const DEFAULT_KEEP_UNUSED_DATA_FOR: Duration = Duration::from_secs(60);

type QueryFn = Arc<dyn Fn(&Value) -> HttpRequest + Send + Sync>;
type TransformFn = Arc<dyn Fn(Value, &Value) -> Result<Value, FetchError> + Send + Sync>;
type TransformErrorFn = Arc<dyn Fn(FetchError, &Value) -> Value + Send + Sync>;
type TagsFn = Arc<dyn Fn(Option<&Value>, &Value) -> Vec<Tag> + Send + Sync>;

/// Whether an endpoint reads (cached, deduplicated) or writes (fire once)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    /// Cached read keyed by arguments
    Query,
    /// One-shot write
    Mutation,
}

/// One named operation of an [`Api`].
///
/// Closures receive the raw JSON arguments the caller supplied.
#[derive(Clone)]
pub struct EndpointDefinition {
    kind: EndpointKind,
    query: QueryFn,
    transform_response: Option<TransformFn>,
    transform_error_response: Option<TransformErrorFn>,
    provides_tags: Option<TagsFn>,
    invalidates_tags: Option<TagsFn>,
}

impl EndpointDefinition {
    /// A query endpoint
    #[must_use]
    pub fn query<F>(query: F) -> Self
    where
        F: Fn(&Value) -> HttpRequest + Send + Sync + 'static,
    {
        Self::new(EndpointKind::Query, Arc::new(query))
    }

    /// A mutation endpoint
    #[must_use]
    pub fn mutation<F>(query: F) -> Self
    where
        F: Fn(&Value) -> HttpRequest + Send + Sync + 'static,
    {
        Self::new(EndpointKind::Mutation, Arc::new(query))
    }

    fn new(kind: EndpointKind, query: QueryFn) -> Self {
        Self {
            kind,
            query,
            transform_response: None,
            transform_error_response: None,
            provides_tags: None,
            invalidates_tags: None,
        }
    }

    /// Reshape a successful body before it is stored
    ///
    /// Returning an error turns the fetch into a rejection.
    #[must_use]
    pub fn transform_response<F>(mut self, f: F) -> Self
    where
        F: Fn(Value, &Value) -> Result<Value, FetchError> + Send + Sync + 'static,
    {
        self.transform_response = Some(Arc::new(f));
        self
    }

    /// Reshape a fetch error before it is stored
    #[must_use]
    pub fn transform_error_response<F>(mut self, f: F) -> Self
    where
        F: Fn(FetchError, &Value) -> Value + Send + Sync + 'static,
    {
        self.transform_error_response = Some(Arc::new(f));
        self
    }

    /// Tags this query's data carries; the result is `None` for a rejection
    #[must_use]
    pub fn provides_tags<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<&Value>, &Value) -> Vec<Tag> + Send + Sync + 'static,
    {
        self.provides_tags = Some(Arc::new(f));
        self
    }

    /// Tags a successful mutation makes stale
    #[must_use]
    pub fn invalidates_tags<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<&Value>, &Value) -> Vec<Tag> + Send + Sync + 'static,
    {
        self.invalidates_tags = Some(Arc::new(f));
        self
    }

    /// Endpoint kind
    #[must_use]
    pub const fn kind(&self) -> EndpointKind {
        self.kind
    }

    /// Build the request for `args`
    #[must_use]
    pub fn request(&self, args: &Value) -> HttpRequest {
        (self.query)(args)
    }

    /// Apply the response transform (identity when none is set)
    ///
    /// # Errors
    ///
    /// Returns the transform's error when it rejects the body.
    pub fn transform(&self, body: Value, args: &Value) -> Result<Value, FetchError> {
        match &self.transform_response {
            Some(transform) => transform(body, args),
            None => Ok(body),
        }
    }

    /// Apply the error transform (structured error JSON when none is set)
    #[must_use]
    pub fn transform_error(&self, error: FetchError, args: &Value) -> Value {
        match &self.transform_error_response {
            Some(transform) => transform(error, args),
            None => error.to_value(),
        }
    }

    /// Tags provided for a result (or rejection)
    #[must_use]
    pub fn provided_tags(&self, result: Option<&Value>, args: &Value) -> Vec<Tag> {
        self.provides_tags
            .as_ref()
            .map_or_else(Vec::new, |tags| tags(result, args))
    }

    /// Tags invalidated by a mutation result
    #[must_use]
    pub fn invalidated_tags(&self, result: Option<&Value>, args: &Value) -> Vec<Tag> {
        self.invalidates_tags
            .as_ref()
            .map_or_else(Vec::new, |tags| tags(result, args))
    }
}

impl std::fmt::Debug for EndpointDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointDefinition")
            .field("kind", &self.kind)
            .field("transform_response", &self.transform_response.is_some())
            .field("transform_error_response", &self.transform_error_response.is_some())
            .field("provides_tags", &self.provides_tags.is_some())
            .field("invalidates_tags", &self.invalidates_tags.is_some())
            .finish_non_exhaustive()
    }
}

/// A named group of endpoints sharing one cache namespace
///
/// # Example
///
/// ```
/// use todo_query_cache::{Api, EndpointDefinition, Tag};
/// use todo_query_core::http::HttpRequest;
///
/// let api = Api::builder("api")
///     .tag_types(["Todos"])
///     .endpoint(
///         "getToDos",
///         EndpointDefinition::query(|_| HttpRequest::get("/todos"))
///             .provides_tags(|_, _| vec![Tag::kind("Todos")]),
///     )
///     .build()
///     .unwrap();
///
/// assert_eq!(api.reducer_path(), "api");
/// assert!(api.endpoint("getToDos").is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct Api {
    reducer_path: String,
    tag_types: Vec<String>,
    keep_unused_data_for: Duration,
    endpoints: BTreeMap<String, EndpointDefinition>,
}

impl Api {
    /// Start building an api mounted at `reducer_path`
    #[must_use]
    pub fn builder(reducer_path: impl Into<String>) -> ApiBuilder {
        ApiBuilder {
            reducer_path: reducer_path.into(),
            tag_types: Vec::new(),
            keep_unused_data_for: DEFAULT_KEEP_UNUSED_DATA_FOR,
            endpoints: BTreeMap::new(),
        }
    }

    /// Namespace of this api's cache in the root state
    #[must_use]
    pub fn reducer_path(&self) -> &str {
        &self.reducer_path
    }

    /// Declared tag types
    #[must_use]
    pub fn tag_types(&self) -> &[String] {
        &self.tag_types
    }

    /// Keep only tags of a declared type
    ///
    /// Tags of any other type never reach the cache's tag index, so they can
    /// neither mark data nor invalidate it.
    #[must_use]
    pub fn declared_tags(&self, tags: Vec<Tag>) -> Vec<Tag> {
        tags.into_iter()
            .filter(|tag| {
                let declared = self.tag_types.iter().any(|kind| *kind == tag.kind);
                if !declared {
                    tracing::warn!(
                        reducer_path = %self.reducer_path,
                        kind = %tag.kind,
                        "Ignoring tag of an undeclared type"
                    );
                }
                declared
            })
            .collect()
    }

    /// Grace period for unobserved entries
    #[must_use]
    pub const fn keep_unused_data_for(&self) -> Duration {
        self.keep_unused_data_for
    }

    /// Look up an endpoint by name
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::UnknownEndpoint`] if no endpoint has that name.
    pub fn endpoint(&self, name: &str) -> Result<&EndpointDefinition, CacheError> {
        self.endpoints
            .get(name)
            .ok_or_else(|| CacheError::UnknownEndpoint(name.to_string()))
    }

    /// Endpoint names, sorted
    pub fn endpoint_names(&self) -> impl Iterator<Item = &str> {
        self.endpoints.keys().map(String::as_str)
    }
}

/// Builder for [`Api`]
#[derive(Debug)]
pub struct ApiBuilder {
    reducer_path: String,
    tag_types: Vec<String>,
    keep_unused_data_for: Duration,
    endpoints: BTreeMap<String, EndpointDefinition>,
}

impl ApiBuilder {
    /// Declare the tag types endpoints may use
    ///
    /// Provided or invalidated tags of any other type are ignored.
    #[must_use]
    pub fn tag_types<I, T>(mut self, tag_types: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tag_types.extend(tag_types.into_iter().map(Into::into));
        self
    }

    /// Override how long unobserved entries are kept
    #[must_use]
    pub const fn keep_unused_data_for(mut self, duration: Duration) -> Self {
        self.keep_unused_data_for = duration;
        self
    }

    /// Add a named endpoint
    #[must_use]
    pub fn endpoint(mut self, name: impl Into<String>, definition: EndpointDefinition) -> Self {
        self.endpoints.insert(name.into(), definition);
        self
    }

    /// Finish the api
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Definition`] if the reducer path or a tag type is
    /// empty, or no endpoint was added.
    pub fn build(self) -> Result<Api, CacheError> {
        if self.reducer_path.is_empty() {
            return Err(CacheError::Definition("reducer path must not be empty".into()));
        }
        if self.tag_types.iter().any(String::is_empty) {
            return Err(CacheError::Definition(format!(
                "api `{}` declares an empty tag type",
                self.reducer_path
            )));
        }
        if self.endpoints.is_empty() {
            return Err(CacheError::Definition(format!(
                "api `{}` has no endpoints",
                self.reducer_path
            )));
        }

        Ok(Api {
            reducer_path: self.reducer_path,
            tag_types: self.tag_types,
            keep_unused_data_for: self.keep_unused_data_for,
            endpoints: self.endpoints,
        })
    }
}
