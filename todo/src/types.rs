//! Domain types for the todo list.
//!
//! The server owns every record; the client only ever holds cached copies and
//! sends commands built from them.

use serde::{Deserialize, Serialize};

/// Server-assigned identifier of a todo
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoId(u64);

impl TodoId {
    /// Creates a `TodoId` from its numeric value
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the numeric value
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TodoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Owner of a todo
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(u64);

impl UserId {
    /// Creates a `UserId` from its numeric value
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

/// The single user this client creates todos for
pub const DEFAULT_USER: UserId = UserId::new(1);

/// A todo as stored by the server
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    /// Unique identifier, never changed by the client
    pub id: TodoId,
    /// What needs doing
    pub title: String,
    /// Whether it is done
    pub completed: bool,
    /// Owner
    pub user_id: UserId,
}

impl Todo {
    /// The same todo with its completion flag flipped
    #[must_use]
    pub fn toggled(&self) -> Self {
        Self {
            completed: !self.completed,
            ..self.clone()
        }
    }
}

/// Input for creating a todo: a title plus optional fields the server may default
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTodo {
    /// What needs doing
    pub title: String,
    /// Initial completion flag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    /// Owner
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

impl NewTodo {
    /// An open todo for the default user
    #[must_use]
    pub fn open(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            completed: Some(false),
            user_id: Some(DEFAULT_USER),
        }
    }
}

/// Reference to a todo by id alone
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoRef {
    /// Identifier
    pub id: TodoId,
}
