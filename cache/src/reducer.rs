//! The api reducer: fetch lifecycle, deduplication, tag invalidation,
//! polling and garbage collection of unobserved entries.
//!
//! All network work is returned as `Effect::Http`; the reducer itself only
//! touches [`ApiState`].

use crate::action::ApiAction;
use crate::api::{Api, EndpointDefinition, EndpointKind};
use crate::state::{
    ApiState, MutationEntry, QueryEntry, QueryKey, QueryStatus, RequestId, SubscriberId,
    SubscriptionOptions,
};
use crate::tags::Tag;
use serde_json::Value;
use std::sync::Arc;
use todo_query_core::{
    delay, effect::Effect, environment::Clock, fetch, http::HttpTransport, reducer::Reducer,
    smallvec, SmallVec,
};
use uuid::Uuid;

type Effects = SmallVec<[Effect<ApiAction>; 4]>;

// Note: Precision loss acceptable for metrics (entry counts < 2^52)
#[allow(clippy::cast_precision_loss)]
fn record_entry_count(state: &ApiState) {
    metrics::gauge!("query.entries").set(state.queries.len() as f64);
}

/// Dependencies of the api reducer
#[derive(Clone)]
pub struct ApiEnvironment {
    /// Executes requests against the api's base address
    pub transport: Arc<dyn HttpTransport>,
    /// Timestamps for entries
    pub clock: Arc<dyn Clock>,
}

impl ApiEnvironment {
    /// Creates a new `ApiEnvironment`
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>, clock: Arc<dyn Clock>) -> Self {
        Self { transport, clock }
    }
}

/// Reducer for one [`Api`]
#[derive(Clone, Debug)]
pub struct ApiReducer {
    api: Arc<Api>,
}

impl ApiReducer {
    /// Creates a reducer for `api`
    #[must_use]
    pub const fn new(api: Arc<Api>) -> Self {
        Self { api }
    }

    /// The api this reducer serves
    #[must_use]
    pub fn api(&self) -> &Api {
        &self.api
    }

    fn definition(&self, endpoint: &str, expected: EndpointKind) -> Option<&EndpointDefinition> {
        match self.api.endpoint(endpoint) {
            Ok(definition) if definition.kind() == expected => Some(definition),
            Ok(_) => {
                tracing::warn!(endpoint, kind = ?expected, "Endpoint used as the wrong kind");
                None
            },
            Err(error) => {
                tracing::warn!(error = %error, "Ignoring action for unknown endpoint");
                None
            },
        }
    }

    /// Put `key` into `Loading` under a fresh request id and describe the fetch.
    ///
    /// Any result still in flight for the previous request id will be ignored.
    fn start_query(&self, state: &mut ApiState, key: &QueryKey, env: &ApiEnvironment) -> Effects {
        let Some(entry) = state.queries.get_mut(key) else {
            return SmallVec::new();
        };
        let Some(definition) = self.definition(&entry.endpoint, EndpointKind::Query) else {
            return SmallVec::new();
        };

        let request_id = RequestId::new();
        entry.status = QueryStatus::Loading;
        entry.request_id = Some(request_id);
        entry.started_at = Some(env.clock.now());
        entry.invalidated = false;

        tracing::debug!(key = %key, request_id = %request_id, "Starting query");
        metrics::counter!("query.fetch.started", "endpoint" => entry.endpoint.clone()).increment(1);

        let request = definition.request(&entry.args);
        let args = entry.args.clone();
        let on_success = (definition.clone(), key.clone(), args.clone());
        let on_error = (definition.clone(), key.clone(), args);

        smallvec![fetch! {
            transport: env.transport,
            request: request,
            on_success: |body| {
                let (definition, key, args) = on_success;
                Some(match definition.transform(body, &args) {
                    Ok(data) => ApiAction::QueryFulfilled { key, request_id, data },
                    Err(error) => ApiAction::QueryRejected {
                        key,
                        request_id,
                        error: definition.transform_error(error, &args),
                    },
                })
            },
            on_error: |error| {
                let (definition, key, args) = on_error;
                Some(ApiAction::QueryRejected {
                    key,
                    request_id,
                    error: definition.transform_error(error, &args),
                })
            }
        }]
    }

    /// Schedule the next poll after the fetch `request_id`, if anyone polls
    fn schedule_poll(state: &ApiState, key: &QueryKey, request_id: RequestId) -> Effects {
        match state.polling_interval(key) {
            Some(interval) => smallvec![delay! {
                duration: interval,
                action: ApiAction::PollTick { key: key.clone(), request_id }
            }],
            None => SmallVec::new(),
        }
    }

    fn subscribe(
        &self,
        state: &mut ApiState,
        endpoint: String,
        args: Value,
        subscriber: SubscriberId,
        options: SubscriptionOptions,
        env: &ApiEnvironment,
    ) -> Effects {
        if self.definition(&endpoint, EndpointKind::Query).is_none() {
            return SmallVec::new();
        }

        let key = QueryKey::new(&endpoint, &args);
        state
            .subscriptions
            .entry(key.clone())
            .or_default()
            .insert(subscriber, options);

        let entry = state
            .queries
            .entry(key.clone())
            .or_insert_with(|| QueryEntry::new(endpoint, args));
        entry.pending_removal = None;
        let (status, invalidated, request_id) = (entry.status, entry.invalidated, entry.request_id);
        record_entry_count(state);

        match status {
            QueryStatus::Loading => {
                tracing::trace!(key = %key, "Fetch already in flight");
                SmallVec::new()
            },
            QueryStatus::Uninitiated | QueryStatus::Error => self.start_query(state, &key, env),
            QueryStatus::Success if invalidated => self.start_query(state, &key, env),
            QueryStatus::Success => {
                metrics::counter!("query.cache.hits").increment(1);
                match (options.polling_interval, request_id) {
                    (Some(_), Some(request_id)) => Self::schedule_poll(state, &key, request_id),
                    _ => SmallVec::new(),
                }
            },
        }
    }

    fn unsubscribe(&self, state: &mut ApiState, key: QueryKey, subscriber: SubscriberId) -> Effects {
        let remaining = match state.subscriptions.get_mut(&key) {
            Some(observers) => {
                observers.remove(&subscriber);
                observers.len()
            },
            None => 0,
        };
        if remaining > 0 {
            return SmallVec::new();
        }
        state.subscriptions.remove(&key);

        let Some(entry) = state.queries.get_mut(&key) else {
            return SmallVec::new();
        };

        let token = Uuid::new_v4();
        entry.pending_removal = Some(token);
        tracing::debug!(key = %key, "Last observer left, scheduling removal");

        smallvec![delay! {
            duration: self.api.keep_unused_data_for(),
            action: ApiAction::RemoveUnused { key, token }
        }]
    }

    fn invalidate(&self, state: &mut ApiState, tags: &[Tag], env: &ApiEnvironment) -> Effects {
        let keys = state.keys_invalidated_by(tags);
        let mut effects = SmallVec::new();

        for key in keys {
            metrics::counter!("query.invalidations").increment(1);

            if state.subscriber_count(&key) > 0 {
                tracing::debug!(key = %key, "Refetching invalidated query");
                effects.extend(self.start_query(state, &key, env));
            } else if let Some(entry) = state.queries.get_mut(&key) {
                tracing::debug!(key = %key, "Marking unobserved query invalidated");
                entry.invalidated = true;
            }
        }

        effects
    }

    fn mutate(
        &self,
        state: &mut ApiState,
        request_id: RequestId,
        endpoint: String,
        args: Value,
        env: &ApiEnvironment,
    ) -> Effects {
        let Some(definition) = self.definition(&endpoint, EndpointKind::Mutation) else {
            return SmallVec::new();
        };

        tracing::debug!(endpoint = %endpoint, request_id = %request_id, "Starting mutation");
        metrics::counter!("mutation.started", "endpoint" => endpoint.clone()).increment(1);

        let request = definition.request(&args);
        let on_success = (definition.clone(), args.clone());
        let on_error = (definition.clone(), args.clone());

        state.mutations.insert(
            request_id,
            MutationEntry {
                endpoint,
                args,
                status: QueryStatus::Loading,
                data: None,
                error: None,
                started_at: env.clock.now(),
                fulfilled_at: None,
            },
        );

        smallvec![fetch! {
            transport: env.transport,
            request: request,
            on_success: |body| {
                let (definition, args) = on_success;
                Some(match definition.transform(body, &args) {
                    Ok(data) => ApiAction::MutationFulfilled { request_id, data },
                    Err(error) => ApiAction::MutationRejected {
                        request_id,
                        error: definition.transform_error(error, &args),
                    },
                })
            },
            on_error: |error| {
                let (definition, args) = on_error;
                Some(ApiAction::MutationRejected {
                    request_id,
                    error: definition.transform_error(error, &args),
                })
            }
        }]
    }

    /// Forget a settled mutation once its result has been kept long enough
    fn schedule_mutation_removal(&self, request_id: RequestId) -> Effect<ApiAction> {
        delay! {
            duration: self.api.keep_unused_data_for(),
            action: ApiAction::RemoveMutation { request_id }
        }
    }

    /// Whether `request_id` is the latest fetch of `key`
    fn is_current(state: &ApiState, key: &QueryKey, request_id: RequestId) -> bool {
        let current = state
            .queries
            .get(key)
            .is_some_and(|entry| entry.request_id == Some(request_id));
        if !current {
            tracing::debug!(key = %key, request_id = %request_id, "Dropping stale query result");
            metrics::counter!("query.fetch.stale").increment(1);
        }
        current
    }
}

impl Reducer for ApiReducer {
    type State = ApiState;
    type Action = ApiAction;
    type Environment = ApiEnvironment;

    #[allow(clippy::too_many_lines)]
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Queries ==========
            ApiAction::Subscribe {
                endpoint,
                args,
                subscriber,
                options,
            } => self.subscribe(state, endpoint, args, subscriber, options, env),

            ApiAction::Unsubscribe { key, subscriber } => self.unsubscribe(state, key, subscriber),

            ApiAction::Refetch { key } => match state.queries.get(&key) {
                Some(entry) if entry.status == QueryStatus::Loading => SmallVec::new(),
                Some(_) => self.start_query(state, &key, env),
                None => {
                    tracing::warn!(key = %key, "Refetch for a query that is not cached");
                    SmallVec::new()
                },
            },

            ApiAction::QueryFulfilled {
                key,
                request_id,
                data,
            } => {
                if !Self::is_current(state, &key, request_id) {
                    return SmallVec::new();
                }
                let Some(entry) = state.queries.get_mut(&key) else {
                    return SmallVec::new();
                };

                let tags = self
                    .api
                    .endpoint(&entry.endpoint)
                    .map(|definition| definition.provided_tags(Some(&data), &entry.args))
                    .unwrap_or_default();
                let tags = self.api.declared_tags(tags);

                entry.status = QueryStatus::Success;
                entry.data = Some(data);
                entry.error = None;
                entry.fulfilled_at = Some(env.clock.now());
                metrics::counter!("query.fetch.fulfilled").increment(1);
                tracing::debug!(key = %key, "Query fulfilled");

                state.set_provided_tags(&key, tags);
                Self::schedule_poll(state, &key, request_id)
            },

            ApiAction::QueryRejected {
                key,
                request_id,
                error,
            } => {
                if !Self::is_current(state, &key, request_id) {
                    return SmallVec::new();
                }
                let Some(entry) = state.queries.get_mut(&key) else {
                    return SmallVec::new();
                };

                let tags = self
                    .api
                    .endpoint(&entry.endpoint)
                    .map(|definition| definition.provided_tags(None, &entry.args))
                    .unwrap_or_default();
                let tags = self.api.declared_tags(tags);

                tracing::warn!(key = %key, error = %error, "Query rejected");
                entry.status = QueryStatus::Error;
                entry.error = Some(error);
                metrics::counter!("query.fetch.rejected").increment(1);

                state.set_provided_tags(&key, tags);
                Self::schedule_poll(state, &key, request_id)
            },

            ApiAction::PollTick { key, request_id } => {
                let due = state.queries.get(&key).is_some_and(|entry| {
                    entry.request_id == Some(request_id) && entry.status != QueryStatus::Loading
                });
                if due && state.polling_interval(&key).is_some() {
                    tracing::trace!(key = %key, "Polling");
                    self.start_query(state, &key, env)
                } else {
                    SmallVec::new()
                }
            },

            ApiAction::RemoveUnused { key, token } => {
                let unused = state.subscriber_count(&key) == 0
                    && state
                        .queries
                        .get(&key)
                        .is_some_and(|entry| entry.pending_removal == Some(token));
                if unused {
                    tracing::debug!(key = %key, "Removing unused query");
                    state.queries.remove(&key);
                    state.remove_provided_tags(&key);
                    metrics::counter!("query.evictions").increment(1);
                    record_entry_count(state);
                }
                SmallVec::new()
            },

            // ========== Mutations ==========
            ApiAction::Mutate {
                request_id,
                endpoint,
                args,
            } => self.mutate(state, request_id, endpoint, args, env),

            ApiAction::MutationFulfilled { request_id, data } => {
                let Some(entry) = state.mutations.get_mut(&request_id) else {
                    return SmallVec::new();
                };

                let tags = self
                    .api
                    .endpoint(&entry.endpoint)
                    .map(|definition| definition.invalidated_tags(Some(&data), &entry.args))
                    .unwrap_or_default();
                let tags = self.api.declared_tags(tags);

                tracing::debug!(endpoint = %entry.endpoint, request_id = %request_id, "Mutation fulfilled");
                entry.status = QueryStatus::Success;
                entry.data = Some(data);
                entry.fulfilled_at = Some(env.clock.now());

                let mut effects = self.invalidate(state, &tags, env);
                effects.push(self.schedule_mutation_removal(request_id));
                effects
            },

            ApiAction::MutationRejected { request_id, error } => {
                if let Some(entry) = state.mutations.get_mut(&request_id) {
                    tracing::warn!(
                        endpoint = %entry.endpoint,
                        request_id = %request_id,
                        error = %error,
                        "Mutation rejected"
                    );
                    metrics::counter!("mutation.failed").increment(1);
                    entry.status = QueryStatus::Error;
                    entry.error = Some(error);
                    entry.fulfilled_at = Some(env.clock.now());
                    smallvec![self.schedule_mutation_removal(request_id)]
                } else {
                    SmallVec::new()
                }
            },

            ApiAction::RemoveMutation { request_id } => {
                let settled = state
                    .mutations
                    .get(&request_id)
                    .is_some_and(|entry| entry.status != QueryStatus::Loading);
                if settled {
                    tracing::debug!(request_id = %request_id, "Removing settled mutation");
                    state.mutations.remove(&request_id);
                    metrics::counter!("mutation.evictions").increment(1);
                }
                SmallVec::new()
            },

            // ========== Utilities ==========
            ApiAction::InvalidateTags(tags) => {
                let tags = self.api.declared_tags(tags);
                self.invalidate(state, &tags, env)
            },

            ApiAction::ResetApiState => {
                tracing::debug!(reducer_path = self.api.reducer_path(), "Resetting api state");
                *state = ApiState::default();
                metrics::gauge!("query.entries").set(0.0);
                SmallVec::new()
            },
        }
    }
}
