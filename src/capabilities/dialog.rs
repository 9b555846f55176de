//! Native dialog handler
//!
//! Picking a directory in a dialog is an explicit user grant: the chosen
//! directory is appended to the policy's allowed directories.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::core::KernelResult;
use crate::permissions::{Capability, Policy};
use crate::resolve::to_slash;
use crate::router::{parse_params, Handler, HandlerError, HandlerResult, Router};

pub const OPEN_DIRECTORY_METHOD: &str = "dialog.openDirectory";

/// Options shown on a directory picker
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryPrompt {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub default_path: Option<String>,
}

/// Host side of native dialogs
#[async_trait]
pub trait DialogProvider: Send + Sync {
    /// Ask the user for a directory; `None` when cancelled
    async fn pick_directory(&self, prompt: DirectoryPrompt) -> KernelResult<Option<PathBuf>>;
}

/// Provider for hosts without a display; every prompt is cancelled
#[derive(Debug, Default)]
pub struct HeadlessDialog;

#[async_trait]
impl DialogProvider for HeadlessDialog {
    async fn pick_directory(&self, prompt: DirectoryPrompt) -> KernelResult<Option<PathBuf>> {
        tracing::debug!("No dialog available, cancelling prompt {:?}", prompt.title);
        Ok(None)
    }
}

pub struct OpenDirectoryHandler {
    policy: Arc<Policy>,
    provider: Arc<dyn DialogProvider>,
}

impl OpenDirectoryHandler {
    pub fn new(policy: Arc<Policy>, provider: Arc<dyn DialogProvider>) -> Self {
        Self { policy, provider }
    }
}

#[async_trait]
impl Handler for OpenDirectoryHandler {
    async fn call(&self, params: Value) -> HandlerResult {
        self.policy
            .check(Capability::Dialog)
            .map_err(|e| e.with_method(OPEN_DIRECTORY_METHOD))?;

        let prompt: DirectoryPrompt = if params.is_null() {
            DirectoryPrompt::default()
        } else {
            parse_params(params)?
        };

        let picked = self
            .provider
            .pick_directory(prompt)
            .await
            .map_err(|e| HandlerError::failed(e.to_string()))?;

        match picked {
            Some(dir) => {
                let granted = self.policy.allow_dir(&dir);
                tracing::info!("User granted directory: {}", granted.display());
                Ok(Value::String(to_slash(&granted)))
            }
            None => Ok(Value::Null),
        }
    }
}

pub fn register(
    router: &Router,
    policy: &Arc<Policy>,
    provider: &Arc<dyn DialogProvider>,
) -> KernelResult<()> {
    router.handle(
        OPEN_DIRECTORY_METHOD,
        OpenDirectoryHandler::new(Arc::clone(policy), Arc::clone(provider)),
    )
}
