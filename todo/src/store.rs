//! Composition root: the application state, its actions and the store handle.
//!
//! ```text
//! AppState
//! ├── api       ApiState      (remote cache, namespace "api")
//! └── text_box  TextBoxState  (new-todo input)
//! ```
//!
//! Each slice reducer is scoped into the root with [`scope_reducer`] and the
//! two are run side by side with [`combine_reducers`].

use crate::api::{get_todos_key, get_todos_title_key, todo_api};
use crate::config::Config;
use crate::text_box::{TextBoxAction, TextBoxReducer, TextBoxState};
use crate::types::Todo;
use std::sync::Arc;
use std::time::Duration;
use todo_query_cache::{
    select_query, Api, ApiAction, ApiEnvironment, ApiReducer, ApiState, CacheError, QueryResult,
    ReqwestTransport, SubscriptionOptions,
};
use todo_query_core::composition::{combine_reducers, scope_reducer, CombinedReducer, SharedReducer};
use todo_query_core::environment::{Clock, SystemClock};
use todo_query_core::http::HttpTransport;
use todo_query_runtime::{Store, StoreError};
use tokio::sync::watch;

/// Root state
#[derive(Debug, Clone, Default)]
pub struct AppState {
    /// Remote data cache
    pub api: ApiState,
    /// New-todo input
    pub text_box: TextBoxState,
}

/// Root action
#[derive(Debug, Clone, PartialEq)]
pub enum AppAction {
    /// Routed to the api slice
    Api(ApiAction),
    /// Routed to the text box slice
    TextBox(TextBoxAction),
}

impl From<ApiAction> for AppAction {
    fn from(action: ApiAction) -> Self {
        Self::Api(action)
    }
}

impl From<TextBoxAction> for AppAction {
    fn from(action: TextBoxAction) -> Self {
        Self::TextBox(action)
    }
}

/// Root environment
#[derive(Clone)]
pub struct AppEnvironment {
    /// Dependencies of the api slice
    pub api: ApiEnvironment,
}

/// The combined root reducer
pub type RootReducer = CombinedReducer<AppState, AppAction, AppEnvironment>;

/// The application store
pub type AppStore = Store<AppState, AppAction, AppEnvironment, RootReducer>;

fn api_state(state: &mut AppState) -> &mut ApiState {
    &mut state.api
}

fn api_action(action: AppAction) -> Option<ApiAction> {
    match action {
        AppAction::Api(action) => Some(action),
        AppAction::TextBox(_) => None,
    }
}

fn api_env(env: &AppEnvironment) -> &ApiEnvironment {
    &env.api
}

fn text_box_state(state: &mut AppState) -> &mut TextBoxState {
    &mut state.text_box
}

fn text_box_action(action: AppAction) -> Option<TextBoxAction> {
    match action {
        AppAction::TextBox(action) => Some(action),
        AppAction::Api(_) => None,
    }
}

fn text_box_env(_env: &AppEnvironment) -> &() {
    &()
}

/// Build the root reducer for `api`
#[must_use]
pub fn root_reducer(api: Arc<Api>) -> RootReducer {
    let api: SharedReducer<AppState, AppAction, AppEnvironment> = Arc::new(scope_reducer(
        ApiReducer::new(api),
        api_state,
        api_action,
        AppAction::Api,
        api_env,
    ));
    let text_box: SharedReducer<AppState, AppAction, AppEnvironment> = Arc::new(scope_reducer(
        TextBoxReducer,
        text_box_state,
        text_box_action,
        AppAction::TextBox,
        text_box_env,
    ));
    combine_reducers(vec![api, text_box])
}

/// Current contents of the text box
#[must_use]
pub fn select_text_box(state: &AppState) -> &str {
    &state.text_box.todo_text
}

/// The todo list, newest first
#[must_use]
pub fn select_todos(state: &AppState) -> QueryResult<Vec<Todo>> {
    select_query(&state.api, &get_todos_key())
}

/// Titles of all todos in server order
#[must_use]
pub fn select_todo_titles(state: &AppState) -> QueryResult<Vec<String>> {
    select_query(&state.api, &get_todos_title_key())
}

/// Handle to the running application
///
/// Reads go through [`App::select`], writes through [`App::dispatch`]; nothing
/// else touches the state.
#[derive(Clone)]
pub struct App {
    store: AppStore,
    api: Arc<Api>,
    subscription: SubscriptionOptions,
}

impl App {
    /// Start the application against the configured server
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the base address is invalid or the api
    /// definition is rejected.
    pub fn new(config: &Config) -> Result<Self, CacheError> {
        let transport = ReqwestTransport::new(&config.api_base_url)?;
        Self::with_transport(config, Arc::new(transport), Arc::new(SystemClock))
    }

    /// Start the application with explicit dependencies
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the api definition is rejected.
    pub fn with_transport(
        config: &Config,
        transport: Arc<dyn HttpTransport>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CacheError> {
        let api = Arc::new(todo_api(config.keep_unused_data_for)?);
        let env = AppEnvironment {
            api: ApiEnvironment::new(transport, clock),
        };
        let store = Store::new(AppState::default(), root_reducer(Arc::clone(&api)), env);

        tracing::info!(
            base_url = %config.api_base_url,
            reducer_path = api.reducer_path(),
            "Application store created"
        );

        Ok(Self {
            store,
            api,
            subscription: SubscriptionOptions {
                polling_interval: config.polling_interval,
            },
        })
    }

    /// The todo api definition
    #[must_use]
    pub fn api(&self) -> &Api {
        &self.api
    }

    /// Options new subscriptions should use
    #[must_use]
    pub const fn subscription_options(&self) -> SubscriptionOptions {
        self.subscription
    }

    /// Read the state through `f`
    pub async fn select<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&AppState) -> T,
    {
        self.store.state(f).await
    }

    /// Dispatch an action; returns once it is reduced, not when its requests finish
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`App::shutdown`].
    pub async fn dispatch(&self, action: impl Into<AppAction>) -> Result<(), StoreError> {
        let action = action.into();
        tracing::trace!(?action, "dispatch");
        self.store.send(action).await
    }

    /// Notified after every reduction
    #[must_use]
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.store.subscribe_state()
    }

    /// Wait until no request or timer is outstanding
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if work is still running after `timeout`.
    pub async fn wait_until_idle(&self, timeout: Duration) -> Result<(), StoreError> {
        self.store.wait_until_idle(timeout).await
    }

    /// Stop accepting actions and wait for outstanding work
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if work is still running after `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        self.store.shutdown(timeout).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use todo_query_cache::{QueryStatus, RequestId, SubscriberId};
    use todo_query_core::reducer::Reducer;
    use todo_query_testing::{assertions, test_clock, MockTransport, ReducerTest};

    fn env() -> AppEnvironment {
        AppEnvironment {
            api: ApiEnvironment::new(Arc::new(MockTransport::new()), Arc::new(test_clock())),
        }
    }

    fn reducer() -> RootReducer {
        root_reducer(Arc::new(todo_api(Duration::from_secs(60)).unwrap()))
    }

    #[test]
    fn text_box_action_only_touches_text_box() {
        ReducerTest::new(reducer())
            .with_env(env())
            .given_state(AppState::default())
            .when_action(AppAction::TextBox(TextBoxAction::SetTextBox("milk".into())))
            .then_state(|state| {
                assert_eq!(select_text_box(state), "milk");
                assert!(state.api.queries.is_empty());
            })
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[test]
    fn api_action_is_routed_and_effects_are_lifted() {
        let mut state = AppState::default();
        let effects = reducer().reduce(
            &mut state,
            AppAction::Api(ApiAction::Subscribe {
                endpoint: crate::api::GET_TODOS.into(),
                args: serde_json::Value::Null,
                subscriber: SubscriberId::new(),
                options: SubscriptionOptions::default(),
            }),
            &env(),
        );

        assertions::assert_http_requests(&effects, &["GET /todos"]);
        assert!(select_todos(&state).is_loading());
        assert!(state.text_box.todo_text.is_empty());
    }

    #[test]
    fn selectors_decode_typed_rows() {
        let mut state = AppState::default();
        let reducer = reducer();
        let key = get_todos_key();
        let _ = reducer.reduce(
            &mut state,
            AppAction::Api(ApiAction::Subscribe {
                endpoint: crate::api::GET_TODOS.into(),
                args: serde_json::Value::Null,
                subscriber: SubscriberId::new(),
                options: SubscriptionOptions::default(),
            }),
            &env(),
        );
        let request_id = state.api.query(&key).unwrap().request_id.unwrap();
        let _ = reducer.reduce(
            &mut state,
            AppAction::Api(ApiAction::QueryFulfilled {
                key,
                request_id,
                data: json!([{ "id": 2, "title": "b", "completed": false, "userId": 1 }]),
            }),
            &env(),
        );

        let todos = select_todos(&state);
        assert_eq!(todos.status, QueryStatus::Success);
        assert_eq!(todos.data.unwrap()[0].title, "b");
        assert!(select_todo_titles(&state).is_uninitiated());
    }

    #[tokio::test]
    async fn dispatch_after_shutdown_is_rejected() {
        let app = App::with_transport(
            &Config::default(),
            Arc::new(MockTransport::new()),
            Arc::new(test_clock()),
        )
        .unwrap();

        app.shutdown(Duration::from_secs(1)).await.unwrap();
        let result = app
            .dispatch(crate::api::add_todo(RequestId::new(), &crate::types::NewTodo::open("x")).unwrap())
            .await;

        assert!(matches!(result, Err(StoreError::ShutdownInProgress)));
    }
}
