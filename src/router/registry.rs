//! Method registry and request dispatch

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use regex::Regex;
use serde_json::Value;

use super::channels::{create_event_channel, EventReceiver, EventSender};
use super::envelope::{Event, Request, Response};
use super::handler::Handler;
use crate::core::{KernelError, KernelResult};

/// `namespace.verb`, optionally with further dotted segments
const METHOD_NAME_PATTERN: &str = r"^[A-Za-z][A-Za-z0-9_]*(\.[A-Za-z][A-Za-z0-9_]*)+$";

/// Compiled once and shared by every registration
static METHOD_NAME: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(METHOD_NAME_PATTERN));

/// Maps method names to handlers and owns the outbound event channel.
///
/// The router has no knowledge of capabilities; handlers are registered
/// already wrapped with whatever check they need.
pub struct Router {
    handlers: RwLock<HashMap<String, Arc<dyn Handler>>>,
    events: EventSender,
}

impl Router {
    /// Create a router with no registered methods
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            events: create_event_channel(),
        }
    }

    /// Register a handler under a dotted method name
    ///
    /// Registering the same name twice replaces the earlier handler.
    pub fn handle<H: Handler + 'static>(&self, method: &str, handler: H) -> KernelResult<()> {
        let pattern = METHOD_NAME
            .as_ref()
            .map_err(|e| KernelError::other(e.to_string()))?;
        if !pattern.is_match(method) {
            return Err(KernelError::InvalidMethod(method.to_string()));
        }

        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        if handlers.insert(method.to_string(), Arc::new(handler)).is_some() {
            tracing::warn!("Replacing handler for method: {}", method);
        } else {
            tracing::debug!("Registered method: {}", method);
        }
        Ok(())
    }

    /// Whether a handler is registered for the method
    pub fn has_method(&self, method: &str) -> bool {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(method)
    }

    /// All registered method names, sorted
    pub fn methods(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Decode one raw request, run its handler and encode the response
    ///
    /// Every input yields exactly one response. A malformed envelope gets an
    /// error response with an empty id.
    pub async fn dispatch(&self, raw: &str) -> String {
        let response = match serde_json::from_str::<Request>(raw) {
            Ok(request) => self.dispatch_request(request).await,
            Err(e) => {
                tracing::warn!("Malformed request envelope: {}", e);
                Response::error("", format!("malformed request: {}", e))
            }
        };
        response.encode()
    }

    /// Run an already decoded request
    pub async fn dispatch_request(&self, request: Request) -> Response {
        let Request { id, method, params } = request;

        // Clone the handler out so no lock is held across the await
        let handler = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&method)
            .cloned();

        let Some(handler) = handler else {
            tracing::debug!(id = %id, "Unknown method: {}", method);
            return Response::error(id, format!("unknown method: {}", method));
        };

        tracing::debug!(id = %id, method = %method, "Dispatching request");

        match handler.call(params).await {
            Ok(result) => Response::success(id, result),
            Err(e) => {
                tracing::debug!(id = %id, method = %method, "Request failed: {}", e);
                Response::error(id, e.to_string())
            }
        }
    }

    /// Push an event to the attached transport
    ///
    /// Fire-and-forget: with no subscriber attached the event is dropped.
    pub fn send_event(&self, name: &str, data: Value) {
        if self.events.send(Event::new(name, data)).is_err() {
            tracing::trace!("Dropped event with no subscriber: {}", name);
        }
    }

    /// Attach a transport to the event stream
    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::core::RejectionError;
    use crate::router::handler::{HandlerError, HandlerResult};

    fn decode(raw: &str) -> Response {
        serde_json::from_str(raw).unwrap()
    }

    fn echo_router() -> Router {
        let router = Router::new();
        router
            .handle("test.echo", |params: Value| async move { HandlerResult::Ok(params) })
            .unwrap();
        router
    }

    #[test]
    fn test_method_name_validation() {
        let router = Router::new();
        let noop = |_: Value| async move { HandlerResult::Ok(Value::Null) };

        assert!(router.handle("fs.readTextFile", noop).is_ok());
        assert!(router.handle("app.window.close", noop).is_ok());

        for bad in ["", "fs", "fs.", ".read", "fs..read", "fs.read text", "1fs.read"] {
            assert!(
                matches!(router.handle(bad, noop), Err(KernelError::InvalidMethod(_))),
                "{:?} should be rejected",
                bad
            );
        }
        assert_eq!(router.methods(), vec!["app.window.close", "fs.readTextFile"]);
    }

    #[test]
    fn test_method_name_pattern_is_shared() {
        let first = METHOD_NAME.as_ref().unwrap();
        let second = METHOD_NAME.as_ref().unwrap();
        assert!(std::ptr::eq(first, second));

        let router = Router::new();
        for i in 0..100 {
            let name = format!("bulk.m{}", i);
            router
                .handle(&name, |_: Value| async move { HandlerResult::Ok(Value::Null) })
                .unwrap();
        }
        assert_eq!(router.methods().len(), 100);
    }

    #[test]
    fn test_reregistration_replaces() {
        let router = Router::new();
        router
            .handle("test.value", |_: Value| async move { HandlerResult::Ok(json!(1)) })
            .unwrap();
        router
            .handle("test.value", |_: Value| async move { HandlerResult::Ok(json!(2)) })
            .unwrap();
        assert_eq!(router.methods().len(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_success() {
        let router = echo_router();
        let response = decode(
            &router
                .dispatch(r#"{"id":"42","method":"test.echo","params":{"a":1}}"#)
                .await,
        );
        assert_eq!(response, Response::success("42", json!({"a": 1})));
    }

    #[tokio::test]
    async fn test_dispatch_unknown_method_keeps_id() {
        let router = echo_router();
        let response = decode(
            &router
                .dispatch(r#"{"id":"9","method":"nope.nothing","params":null}"#)
                .await,
        );
        assert_eq!(response.id, "9");
        assert_eq!(response.result, Value::Null);
        assert_eq!(response.error.as_deref(), Some("unknown method: nope.nothing"));
    }

    #[tokio::test]
    async fn test_dispatch_malformed_envelope() {
        let router = echo_router();
        for raw in ["", "not json", "{}", r#"{"id":1,"method":"test.echo"}"#, "[1,2]"] {
            let response = decode(&router.dispatch(raw).await);
            assert_eq!(response.id, "", "input {:?}", raw);
            assert!(response.is_error());
            assert_eq!(response.result, Value::Null);
        }
    }

    #[tokio::test]
    async fn test_rejection_passes_through_unchanged() {
        let rejection = RejectionError::new(
            "fs.read",
            "read \"/etc/passwd\"",
            vec!["$HOME/**".to_string()],
            "permissions.fs.read",
        );
        let expected = rejection.to_string();

        let router = Router::new();
        router
            .handle("fs.readTextFile", move |_: Value| {
                let rejection = rejection.clone();
                async move { HandlerResult::Err(HandlerError::from(rejection)) }
            })
            .unwrap();

        let response = decode(
            &router
                .dispatch(r#"{"id":"1","method":"fs.readTextFile","params":{"path":"/etc/passwd"}}"#)
                .await,
        );
        assert_eq!(response.error.as_deref(), Some(expected.as_str()));
        let parsed: RejectionError = expected.parse().unwrap();
        assert_eq!(parsed.config_key, "permissions.fs.read");
    }

    #[tokio::test]
    async fn test_concurrent_requests_route_by_id() {
        const N: u64 = 20;
        let router = Arc::new(Router::new());
        for i in 0..N {
            router
                .handle(&format!("test.h{}", i), move |params: Value| async move {
                    // Earlier handlers finish last
                    tokio::time::sleep(Duration::from_millis((N - i) * 2)).await;
                    HandlerResult::Ok(json!({ "handler": i, "params": params }))
                })
                .unwrap();
        }

        let futures = (0..N).map(|i| {
            let router = Arc::clone(&router);
            async move {
                let raw = json!({
                    "id": format!("req-{}", i),
                    "method": format!("test.h{}", i),
                    "params": { "n": i },
                })
                .to_string();
                decode(&router.dispatch(&raw).await)
            }
        });

        let responses = futures::future::join_all(futures).await;
        assert_eq!(responses.len(), N as usize);
        for (i, response) in responses.iter().enumerate() {
            assert_eq!(response.id, format!("req-{}", i));
            assert!(response.error.is_none());
            assert_eq!(response.result["handler"], json!(i));
            assert_eq!(response.result["params"]["n"], json!(i));
        }
    }

    #[tokio::test]
    async fn test_send_event_without_subscriber_is_dropped() {
        let router = Router::new();
        router.send_event("app.ready", json!(null));

        let mut rx = router.subscribe();
        router.send_event("app.updated", json!({"v": 2}));
        let event = rx.recv().await.unwrap();
        assert_eq!(event, Event::new("app.updated", json!({"v": 2})));
        assert!(rx.try_recv().is_err());
    }
}
