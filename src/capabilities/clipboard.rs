//! Clipboard handlers
//!
//! The system clipboard is host-specific, so the handlers talk to a
//! [`ClipboardProvider`] supplied by the embedding host.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::core::KernelResult;
use crate::permissions::{Capability, Policy};
use crate::router::{parse_params, Handler, HandlerError, HandlerResult, Router};

pub const READ_TEXT_METHOD: &str = "clipboard.readText";
pub const WRITE_TEXT_METHOD: &str = "clipboard.writeText";

/// Access to a text clipboard
#[async_trait]
pub trait ClipboardProvider: Send + Sync {
    /// Current text contents; `None` when the clipboard holds no text
    async fn read_text(&self) -> KernelResult<Option<String>>;

    async fn write_text(&self, text: String) -> KernelResult<()>;
}

/// Process-local clipboard for headless hosts
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    contents: Mutex<Option<String>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClipboardProvider for MemoryClipboard {
    async fn read_text(&self) -> KernelResult<Option<String>> {
        Ok(self
            .contents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    async fn write_text(&self, text: String) -> KernelResult<()> {
        *self.contents.lock().unwrap_or_else(PoisonError::into_inner) = Some(text);
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct WriteTextInput {
    text: String,
}

pub struct ReadTextHandler {
    policy: Arc<Policy>,
    provider: Arc<dyn ClipboardProvider>,
}

#[async_trait]
impl Handler for ReadTextHandler {
    async fn call(&self, _params: Value) -> HandlerResult {
        self.policy
            .check(Capability::Clipboard)
            .map_err(|e| e.with_method(READ_TEXT_METHOD))?;

        let text = self
            .provider
            .read_text()
            .await
            .map_err(|e| HandlerError::failed(e.to_string()))?;
        Ok(text.map(Value::String).unwrap_or(Value::Null))
    }
}

pub struct WriteTextHandler {
    policy: Arc<Policy>,
    provider: Arc<dyn ClipboardProvider>,
}

#[async_trait]
impl Handler for WriteTextHandler {
    async fn call(&self, params: Value) -> HandlerResult {
        self.policy
            .check(Capability::Clipboard)
            .map_err(|e| e.with_method(WRITE_TEXT_METHOD))?;
        let input: WriteTextInput = parse_params(params)?;

        self.provider
            .write_text(input.text)
            .await
            .map_err(|e| HandlerError::failed(e.to_string()))?;
        Ok(Value::Null)
    }
}

pub fn register(
    router: &Router,
    policy: &Arc<Policy>,
    provider: &Arc<dyn ClipboardProvider>,
) -> KernelResult<()> {
    router.handle(
        READ_TEXT_METHOD,
        ReadTextHandler {
            policy: Arc::clone(policy),
            provider: Arc::clone(provider),
        },
    )?;
    router.handle(
        WRITE_TEXT_METHOD,
        WriteTextHandler {
            policy: Arc::clone(policy),
            provider: Arc::clone(provider),
        },
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::resolve::{PathVars, VarSource};

    fn router_with(policy: Policy) -> Router {
        let router = Router::new();
        let provider: Arc<dyn ClipboardProvider> = Arc::new(MemoryClipboard::new());
        register(&router, &Arc::new(policy), &provider).unwrap();
        router
    }

    fn restricted() -> Policy {
        Policy::restricted(VarSource::Fixed(PathVars::default()))
    }

    #[tokio::test]
    async fn test_round_trip_when_declared() {
        let router = router_with(restricted().with_capability(Capability::Clipboard));

        let empty = router
            .dispatch(r#"{"id":"1","method":"clipboard.readText"}"#)
            .await;
        assert_eq!(empty, r#"{"id":"1","result":null}"#);

        router
            .dispatch(r#"{"id":"2","method":"clipboard.writeText","params":{"text":"copied"}}"#)
            .await;
        let read = router
            .dispatch(r#"{"id":"3","method":"clipboard.readText"}"#)
            .await;
        assert_eq!(read, r#"{"id":"3","result":"copied"}"#);
    }

    #[tokio::test]
    async fn test_undeclared_clipboard_is_rejected() {
        let router = router_with(restricted().with_capability(Capability::Dialog));

        let raw = router
            .dispatch(r#"{"id":"7","method":"clipboard.readText"}"#)
            .await;
        let response: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(response["id"], json!("7"));
        assert_eq!(response["result"], Value::Null);

        let error = response["error"].as_str().unwrap();
        assert!(error.starts_with("permission denied: clipboard.readText"));
        assert!(error.contains("[\"dialog\"]"));
        assert!(error.contains("permissions.capabilities"));
    }

    #[tokio::test]
    async fn test_memory_clipboard() {
        let clipboard = MemoryClipboard::new();
        assert_eq!(clipboard.read_text().await.unwrap(), None);
        clipboard.write_text("a".to_string()).await.unwrap();
        assert_eq!(clipboard.read_text().await.unwrap().as_deref(), Some("a"));
    }
}
