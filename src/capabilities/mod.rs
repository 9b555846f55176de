//! Built-in capability handlers
//!
//! Each handler wraps one OS operation with the policy check that governs
//! it. [`register_builtin`] installs all of them on a [`Router`].

pub mod clipboard;
pub mod dialog;
pub mod fs;
pub mod http;
pub mod process;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

pub use clipboard::{ClipboardProvider, MemoryClipboard};
pub use dialog::{DialogProvider, DirectoryPrompt, HeadlessDialog};

use crate::core::KernelResult;
use crate::permissions::Policy;
use crate::router::{Handler, HandlerError, HandlerResult, Router};

pub const DESCRIBE_METHOD: &str = "policy.describe";

/// Host integrations the built-in handlers delegate to
#[derive(Clone)]
pub struct Providers {
    pub clipboard: Arc<dyn ClipboardProvider>,
    pub dialog: Arc<dyn DialogProvider>,
}

impl Providers {
    pub fn new(clipboard: Arc<dyn ClipboardProvider>, dialog: Arc<dyn DialogProvider>) -> Self {
        Self { clipboard, dialog }
    }
}

impl Default for Providers {
    /// In-memory clipboard and no dialogs
    fn default() -> Self {
        Self::new(Arc::new(MemoryClipboard::new()), Arc::new(HeadlessDialog))
    }
}

/// `policy.describe`: lets content inspect what it may do
pub struct DescribeHandler {
    policy: Arc<Policy>,
}

#[async_trait]
impl Handler for DescribeHandler {
    async fn call(&self, _params: Value) -> HandlerResult {
        serde_json::to_value(self.policy.summary()).map_err(|e| HandlerError::failed(e.to_string()))
    }
}

/// Register every built-in capability method on `router`
pub fn register_builtin(
    router: &Router,
    policy: Arc<Policy>,
    providers: Providers,
) -> KernelResult<()> {
    fs::register(router, &policy)?;
    http::register(router, &policy)?;
    process::register(router, &policy)?;
    clipboard::register(router, &policy, &providers.clipboard)?;
    dialog::register(router, &policy, &providers.dialog)?;
    router.handle(DESCRIBE_METHOD, DescribeHandler { policy })?;

    tracing::info!("Registered {} built-in methods", router.methods().len());
    Ok(())
}
