//! Terminal todo client.
//!
//! Reads commands from stdin and re-renders the list whenever the store
//! changes. Configuration comes from the environment (see [`todo::Config`]).

use serde_json::Value;
use std::time::Duration;
use todo::api::GET_TODOS_TITLE;
use todo::store::select_todo_titles;
use todo::{App, AppError, Config, Content, ListView, TodoId, TodoList};
use todo_query_cache::{ApiAction, SubscriberId};
use todo_query_runtime::metrics::MetricsServer;
use todo_query_runtime::StoreError;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

const HELP: &str = "\
commands:
  type <text>    set the new-todo text
  submit         create a todo from the text
  add <text>     type and submit in one go
  toggle <id>    flip completion of a todo
  delete <id>    delete a todo
  titles         show titles only
  view           render the list
  quit           exit";

enum Command {
    Type(String),
    Submit,
    Add(String),
    Toggle(TodoId),
    Delete(TodoId),
    Titles,
    View,
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
    let id = || rest.trim().parse().ok().map(TodoId::new);
    match word {
        "type" => Some(Command::Type(rest.to_string())),
        "submit" => Some(Command::Submit),
        "add" => Some(Command::Add(rest.to_string())),
        "toggle" => id().map(Command::Toggle),
        "delete" => id().map(Command::Delete),
        "titles" => Some(Command::Titles),
        "view" | "" => Some(Command::View),
        "quit" | "exit" => Some(Command::Quit),
        _ => None,
    }
}

struct Session {
    list: TodoList,
    titles: Option<SubscriberId>,
    last_render: Option<ListView>,
}

impl Session {
    async fn render(&mut self, force: bool) {
        let view = self.list.view().await;
        if force || self.last_render.as_ref() != Some(&view) {
            println!("\n{view}");
            self.last_render = Some(view);
        }
    }

    async fn show_titles(&mut self) -> Result<(), AppError> {
        let app = self.list.app();
        if self.titles.is_none() {
            let subscriber = SubscriberId::new();
            app.dispatch(ApiAction::Subscribe {
                endpoint: GET_TODOS_TITLE.to_string(),
                args: Value::Null,
                subscriber,
                options: app.subscription_options(),
            })
            .await?;
            self.titles = Some(subscriber);
        }

        let titles = app.select(select_todo_titles).await;
        if titles.is_error() {
            println!("Error: {}", titles.error.unwrap_or(Value::Null));
        } else if let Some(titles) = titles.data {
            println!("titles: {}", titles.join(", "));
        } else {
            println!("titles: loading, run `titles` again");
        }
        Ok(())
    }

    async fn run(&mut self, command: Command) -> Result<bool, AppError> {
        match command {
            Command::Type(text) => self.list.change_text(text).await?,
            Command::Submit => {
                if self.list.submit().await?.is_none() {
                    println!("nothing to submit");
                }
            },
            Command::Add(text) => {
                self.list.change_text(text).await?;
                if self.list.submit().await?.is_none() {
                    println!("nothing to submit");
                }
            },
            Command::Toggle(id) => {
                let row = match self.list.view().await.content {
                    Content::Loaded(rows) => rows.into_iter().find(|todo| todo.id == id),
                    _ => None,
                };
                match row {
                    Some(todo) => {
                        self.list.toggle(&todo).await?;
                    },
                    None => println!("no todo {id} in the list"),
                }
            },
            Command::Delete(id) => {
                self.list.delete(id).await?;
            },
            Command::Titles => self.show_titles().await?,
            Command::View => self.render(true).await,
            Command::Quit => return Ok(false),
        }
        Ok(true)
    }

    async fn close(self) -> Result<(), AppError> {
        match self.list.app().shutdown(SHUTDOWN_TIMEOUT).await {
            Err(StoreError::ShutdownTimeout(pending)) => {
                tracing::info!(pending, "Abandoning timers and requests still in flight");
                Ok(())
            },
            other => Ok(other?),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut metrics = config.metrics_addr.map(MetricsServer::new);
    if let Some(server) = metrics.as_mut() {
        server.start()?;
    }

    let app = App::new(&config)?;
    let mut changes = app.changes();
    let mut session = Session {
        list: TodoList::mount(app).await?,
        titles: None,
        last_render: None,
    };

    println!("{HELP}");
    session.render(true).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_command(&line) {
                    Some(command) => {
                        if !session.run(command).await? {
                            break;
                        }
                    },
                    None => println!("{HELP}"),
                }
            },
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                session.render(false).await;
            },
        }
    }

    if let Err(error) = session.close().await {
        tracing::warn!(%error, "Shutdown did not complete cleanly");
    }
    Ok(())
}
