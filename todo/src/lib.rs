//! # Todo
//!
//! A todo list client backed by a REST server.
//!
//! Remote data lives in a [`todo_query_cache`] api slice that fetches,
//! deduplicates and refetches the list whenever a create, update or delete
//! succeeds. The new-todo text box is a small local slice. Both are combined
//! into one store ([`store::App`]) that the list view reads from and
//! dispatches commands to.
//!
//! ## Example
//!
//! ```no_run
//! use todo::{App, Config, TodoList};
//!
//! # async fn run() -> Result<(), todo::AppError> {
//! let app = App::new(&Config::from_env()?)?;
//! let list = TodoList::mount(app).await?;
//! list.change_text("buy milk").await?;
//! list.submit().await?;
//! println!("{}", list.view().await);
//! # Ok(())
//! # }
//! ```

/// Todo api slice
pub mod api;

/// Environment configuration
pub mod config;

/// Application error type
pub mod error;

/// Root state, reducer and store handle
pub mod store;

/// New-todo text box slice
pub mod text_box;

/// Domain types
pub mod types;

/// List view and user commands
pub mod view;

pub use config::{Config, ConfigError};
pub use error::AppError;
pub use store::{App, AppAction, AppState};
pub use text_box::{TextBoxAction, TextBoxState};
pub use types::{NewTodo, Todo, TodoId, TodoRef, UserId};
pub use view::{Content, ListView, TodoList};
