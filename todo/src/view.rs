//! The list view: a render model derived from state, and the commands a user
//! can issue from it.
//!
//! Rendering is a pure function of [`AppState`]; commands are plain
//! [`AppAction`] values so both halves can be tested without a store.
//! [`TodoList`] ties them to a running [`App`].

use crate::api::{add_todo, delete_todo, update_todo};
use crate::error::AppError;
use crate::store::{select_text_box, App, AppAction, AppState};
use crate::text_box::TextBoxAction;
use crate::types::{NewTodo, Todo, TodoId, TodoRef};
use serde_json::Value;
use std::fmt;
use todo_query_cache::{select_query, ApiAction, CacheError, QueryKey, QueryStatus, RequestId, SubscriberId};

/// The mutually exclusive content states of the list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// Nothing to show yet
    Loading,
    /// Rows in display order
    Loaded(Vec<Todo>),
    /// Raw error text of the last failed fetch
    Failed(String),
}

/// Everything the list renders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListView {
    /// Text box contents
    pub new_todo: String,
    /// List area
    pub content: Content,
}

fn error_text(error: Option<Value>) -> String {
    match error {
        Some(Value::String(text)) => text,
        Some(other) => other.to_string(),
        None => "unknown error".to_string(),
    }
}

impl ListView {
    /// Build the view for the list query at `key`
    #[must_use]
    pub fn from_state(state: &AppState, key: &QueryKey) -> Self {
        let result = select_query::<Vec<Todo>>(&state.api, key);
        let content = match (result.status, result.data) {
            (QueryStatus::Error, _) => Content::Failed(error_text(result.error)),
            (QueryStatus::Success | QueryStatus::Loading, Some(rows)) => Content::Loaded(rows),
            _ => Content::Loading,
        };

        Self {
            new_todo: select_text_box(state).to_string(),
            content,
        }
    }
}

impl fmt::Display for ListView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "New todo: {}", self.new_todo)?;
        match &self.content {
            Content::Loading => writeln!(f, "Loading..."),
            Content::Failed(error) => writeln!(f, "Error: {error}"),
            Content::Loaded(rows) if rows.is_empty() => writeln!(f, "(nothing to do)"),
            Content::Loaded(rows) => {
                for todo in rows {
                    let mark = if todo.completed { 'x' } else { ' ' };
                    writeln!(f, "[{mark}] {:>4}  {}", todo.id.get(), todo.title)?;
                }
                Ok(())
            },
        }
    }
}

/// Actions for submitting `text` as a new todo
///
/// Blank text yields no actions. Otherwise exactly one create followed by
/// clearing the text box.
///
/// # Errors
///
/// Returns [`CacheError::Serialization`] if the todo cannot be encoded.
pub fn submit_commands(text: &str, request_id: RequestId) -> Result<Vec<AppAction>, CacheError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(vec![
        AppAction::Api(add_todo(request_id, &NewTodo::open(text))?),
        AppAction::TextBox(TextBoxAction::SetTextBox(String::new())),
    ])
}

/// Action flipping the completion of `todo`
///
/// # Errors
///
/// Returns [`CacheError::Serialization`] if the todo cannot be encoded.
pub fn toggle_command(todo: &Todo, request_id: RequestId) -> Result<AppAction, CacheError> {
    Ok(AppAction::Api(update_todo(request_id, &todo.toggled())?))
}

/// Action deleting the todo `id`
///
/// # Errors
///
/// Returns [`CacheError::Serialization`] if the reference cannot be encoded.
pub fn delete_command(id: TodoId, request_id: RequestId) -> Result<AppAction, CacheError> {
    Ok(AppAction::Api(delete_todo(request_id, TodoRef { id })?))
}

/// Action replacing the text box contents
#[must_use]
pub fn change_text_command(text: impl Into<String>) -> AppAction {
    AppAction::TextBox(TextBoxAction::SetTextBox(text.into()))
}

/// A mounted todo list: one observer of the list query
pub struct TodoList {
    app: App,
    key: QueryKey,
    subscriber: SubscriberId,
}

impl TodoList {
    /// Start observing the list; fetches it unless a fresh copy is cached
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Store`] if the store is shutting down.
    pub async fn mount(app: App) -> Result<Self, AppError> {
        let key = crate::api::get_todos_key();
        let subscriber = SubscriberId::new();
        app.dispatch(ApiAction::Subscribe {
            endpoint: crate::api::GET_TODOS.to_string(),
            args: Value::Null,
            subscriber,
            options: app.subscription_options(),
        })
        .await?;

        tracing::debug!(%subscriber, "Todo list mounted");
        Ok(Self { app, key, subscriber })
    }

    /// Stop observing; the cached list is kept for the grace period
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Store`] if the store is shutting down.
    pub async fn unmount(self) -> Result<(), AppError> {
        self.app
            .dispatch(ApiAction::Unsubscribe {
                key: self.key,
                subscriber: self.subscriber,
            })
            .await?;
        Ok(())
    }

    /// The application this list is mounted in
    #[must_use]
    pub const fn app(&self) -> &App {
        &self.app
    }

    /// Current render model
    pub async fn view(&self) -> ListView {
        self.app.select(|state| ListView::from_state(state, &self.key)).await
    }

    /// Submit the text box; returns the create request id, or `None` for blank text
    ///
    /// # Errors
    ///
    /// Returns [`AppError`] if the command cannot be built or dispatched.
    pub async fn submit(&self) -> Result<Option<RequestId>, AppError> {
        let text = self.app.select(|state| select_text_box(state).to_string()).await;
        let request_id = RequestId::new();
        let commands = submit_commands(&text, request_id)?;
        if commands.is_empty() {
            return Ok(None);
        }
        for command in commands {
            self.app.dispatch(command).await?;
        }
        Ok(Some(request_id))
    }

    /// Flip a row's completion
    ///
    /// # Errors
    ///
    /// Returns [`AppError`] if the command cannot be built or dispatched.
    pub async fn toggle(&self, todo: &Todo) -> Result<RequestId, AppError> {
        let request_id = RequestId::new();
        self.app.dispatch(toggle_command(todo, request_id)?).await?;
        Ok(request_id)
    }

    /// Delete a row
    ///
    /// # Errors
    ///
    /// Returns [`AppError`] if the command cannot be built or dispatched.
    pub async fn delete(&self, id: TodoId) -> Result<RequestId, AppError> {
        let request_id = RequestId::new();
        self.app.dispatch(delete_command(id, request_id)?).await?;
        Ok(request_id)
    }

    /// Replace the text box contents
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Store`] if the store is shutting down.
    pub async fn change_text(&self, text: impl Into<String>) -> Result<(), AppError> {
        self.app.dispatch(change_text_command(text)).await?;
        Ok(())
    }
}
