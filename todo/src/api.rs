//! The todo api slice: endpoints, keys and typed command builders.
//!
//! | Endpoint | Request | Cache behavior |
//! |---|---|---|
//! | `getToDos` | `GET /todos` | sorted by id descending, provides `Todos` |
//! | `getToDosTitle` | `GET /todos` | titles only, errors reduced to their status |
//! | `addToDo` | `POST /todos` | invalidates `Todos` |
//! | `updateToDo` | `PATCH /todos/{id}` | invalidates `Todos` |
//! | `deleteToDo` | `DELETE /todos/{id}` | invalidates `Todos` |

use crate::types::{NewTodo, Todo, TodoRef};
use serde_json::Value;
use std::time::Duration;
use todo_query_cache::{Api, ApiAction, CacheError, EndpointDefinition, QueryKey, RequestId, Tag};
use todo_query_core::http::{FetchError, HttpRequest};

/// Namespace of the todo cache in the root state
pub const REDUCER_PATH: &str = "api";

/// Tag provided by the list and invalidated by every write
pub const TODOS_TAG: &str = "Todos";

/// List query, newest first
pub const GET_TODOS: &str = "getToDos";
/// Titles-only query
pub const GET_TODOS_TITLE: &str = "getToDosTitle";
/// Create mutation
pub const ADD_TODO: &str = "addToDo";
/// Update mutation
pub const UPDATE_TODO: &str = "updateToDo";
/// Delete mutation
pub const DELETE_TODO: &str = "deleteToDo";

fn todos_tag() -> Vec<Tag> {
    vec![Tag::kind(TODOS_TAG)]
}

fn todo_path(args: &Value) -> String {
    format!("/todos/{}", args["id"])
}

fn expect_list(body: Value) -> Result<Vec<Value>, FetchError> {
    match body {
        Value::Array(items) => Ok(items),
        other => Err(FetchError::Custom(format!("expected a list of todos, got {other}"))),
    }
}

/// Order todos by id, highest first
fn sort_by_id_descending(body: Value, _args: &Value) -> Result<Value, FetchError> {
    let mut items = expect_list(body)?;
    items.sort_by(|a, b| b["id"].as_u64().cmp(&a["id"].as_u64()));
    Ok(Value::Array(items))
}

fn titles(body: Value, _args: &Value) -> Result<Value, FetchError> {
    let items = expect_list(body)?;
    Ok(items
        .into_iter()
        .map(|mut item| item.get_mut("title").map(Value::take).unwrap_or(Value::Null))
        .collect())
}

/// Build the todo api
///
/// # Errors
///
/// Returns [`CacheError::Definition`] if the definition is invalid.
pub fn todo_api(keep_unused_data_for: Duration) -> Result<Api, CacheError> {
    Api::builder(REDUCER_PATH)
        .tag_types([TODOS_TAG])
        .keep_unused_data_for(keep_unused_data_for)
        .endpoint(
            GET_TODOS,
            EndpointDefinition::query(|_| HttpRequest::get("/todos"))
                .transform_response(sort_by_id_descending)
                .provides_tags(|_, _| todos_tag()),
        )
        .endpoint(
            GET_TODOS_TITLE,
            EndpointDefinition::query(|_| HttpRequest::get("/todos"))
                .transform_response(titles)
                .transform_error_response(|error, _| error.status()),
        )
        .endpoint(
            ADD_TODO,
            EndpointDefinition::mutation(|args| HttpRequest::post("/todos").with_body(args.clone()))
                .invalidates_tags(|_, _| todos_tag()),
        )
        .endpoint(
            UPDATE_TODO,
            EndpointDefinition::mutation(|args| HttpRequest::patch(todo_path(args)).with_body(args.clone()))
                .invalidates_tags(|_, _| todos_tag()),
        )
        .endpoint(
            DELETE_TODO,
            EndpointDefinition::mutation(|args| HttpRequest::delete(todo_path(args)).with_body(args.clone()))
                .invalidates_tags(|_, _| todos_tag()),
        )
        .build()
}

/// Cache key of the list query
#[must_use]
pub fn get_todos_key() -> QueryKey {
    QueryKey::new(GET_TODOS, &Value::Null)
}

/// Cache key of the titles query
#[must_use]
pub fn get_todos_title_key() -> QueryKey {
    QueryKey::new(GET_TODOS_TITLE, &Value::Null)
}

/// Create a todo
///
/// # Errors
///
/// Returns [`CacheError::Serialization`] if the input cannot be encoded.
pub fn add_todo(request_id: RequestId, todo: &NewTodo) -> Result<ApiAction, CacheError> {
    Ok(ApiAction::Mutate {
        request_id,
        endpoint: ADD_TODO.to_string(),
        args: serde_json::to_value(todo)?,
    })
}

/// Replace a todo with `todo` (same id)
///
/// # Errors
///
/// Returns [`CacheError::Serialization`] if the input cannot be encoded.
pub fn update_todo(request_id: RequestId, todo: &Todo) -> Result<ApiAction, CacheError> {
    Ok(ApiAction::Mutate {
        request_id,
        endpoint: UPDATE_TODO.to_string(),
        args: serde_json::to_value(todo)?,
    })
}

/// Delete a todo
///
/// # Errors
///
/// Returns [`CacheError::Serialization`] if the input cannot be encoded.
pub fn delete_todo(request_id: RequestId, todo: TodoRef) -> Result<ApiAction, CacheError> {
    Ok(ApiAction::Mutate {
        request_id,
        endpoint: DELETE_TODO.to_string(),
        args: serde_json::to_value(todo)?,
    })
}
