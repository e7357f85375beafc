//! Declarative macros for ergonomic effect construction
//!
//! These macros reduce boilerplate when creating `Effect` variants, particularly
//! HTTP requests whose outcome is fed back into the reducer.

/// Create an `Effect::Http` that runs a request on an injected transport
///
/// # Example
///
/// ```
/// use todo_query_core::fetch;
/// use todo_query_core::effect::Effect;
/// use todo_query_core::http::{FetchError, HttpRequest, HttpTransport};
/// use serde_json::Value;
/// use std::future::Future;
/// use std::pin::Pin;
/// use std::sync::Arc;
///
/// struct Offline;
///
/// impl HttpTransport for Offline {
///     fn execute(
///         &self,
///         _request: HttpRequest,
///     ) -> Pin<Box<dyn Future<Output = Result<Value, FetchError>> + Send + '_>> {
///         Box::pin(async { Err(FetchError::Fetch("offline".into())) })
///     }
/// }
///
/// #[derive(Debug)]
/// enum Action {
///     Loaded(Value),
///     Failed(String),
/// }
///
/// let transport: Arc<dyn HttpTransport> = Arc::new(Offline);
/// let effect: Effect<Action> = fetch! {
///     transport: transport,
///     request: HttpRequest::get("/todos"),
///     on_success: |body| Some(Action::Loaded(body)),
///     on_error: |error| Some(Action::Failed(error.to_string()))
/// };
/// assert!(effect.as_http_request().is_some());
/// ```
#[macro_export]
macro_rules! fetch {
    (
        transport: $transport:expr,
        request: $request:expr,
        on_success: |$success_param:ident| $success_body:expr,
        on_error: |$error_param:ident| $error_body:expr
    ) => {
        $crate::effect::Effect::Http($crate::effect::HttpOperation {
            transport: ::std::sync::Arc::clone(&$transport),
            request: $request,
            on_success: ::std::boxed::Box::new(move |$success_param| $success_body),
            on_error: ::std::boxed::Box::new(move |$error_param| $error_body),
        })
    };
}

/// Create an `Effect::Delay` that dispatches an action after a duration
///
/// # Example
///
/// ```
/// use todo_query_core::delay;
/// use todo_query_core::effect::Effect;
/// use std::time::Duration;
///
/// let effect: Effect<&str> = delay! {
///     duration: Duration::from_secs(60),
///     action: "expire"
/// };
/// assert!(matches!(effect, Effect::Delay { .. }));
/// ```
#[macro_export]
macro_rules! delay {
    (
        duration: $duration:expr,
        action: $action:expr
    ) => {
        $crate::effect::Effect::Delay {
            duration: $duration,
            action: ::std::boxed::Box::new($action),
        }
    };
}
