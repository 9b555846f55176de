//! Process execution handler

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::process::Command;
use tokio::time::timeout;

use crate::core::KernelResult;
use crate::permissions::Policy;
use crate::router::{parse_params, Handler, HandlerError, HandlerResult, Router};

pub const EXEC_METHOD: &str = "process.exec";

/// Default timeout in milliseconds when neither the call nor the scope sets one
const DEFAULT_TIMEOUT_MS: u64 = 30_000;
/// Maximum timeout in milliseconds (10 minutes)
const MAX_TIMEOUT_MS: u64 = 600_000;

/// Input for `process.exec`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecInput {
    cmd: String,
    #[serde(default)]
    args: Vec<String>,
    timeout_ms: Option<u64>,
}

/// Runs a declared command directly, without a shell
pub struct ExecHandler {
    policy: Arc<Policy>,
}

impl ExecHandler {
    pub fn new(policy: Arc<Policy>) -> Self {
        Self { policy }
    }

    /// The declared timeout (or the default) is a ceiling; a call may only
    /// ask for less
    fn timeout_for(&self, requested: Option<u64>) -> Duration {
        let limit = self
            .policy
            .process_scope()
            .and_then(|s| s.timeout_ms)
            .unwrap_or(DEFAULT_TIMEOUT_MS)
            .min(MAX_TIMEOUT_MS);
        let ms = requested.map_or(limit, |r| r.min(limit));
        Duration::from_millis(ms)
    }
}

#[async_trait]
impl Handler for ExecHandler {
    async fn call(&self, params: Value) -> HandlerResult {
        let input: ExecInput = parse_params(params)?;
        self.policy
            .check_process(&input.cmd, &input.args)
            .map_err(|e| e.with_method(EXEC_METHOD))?;

        let duration = self.timeout_for(input.timeout_ms);
        tracing::info!("Executing process: {} {:?}", input.cmd, input.args);
        tracing::debug!("Timeout: {}ms", duration.as_millis());

        let output_future = Command::new(&input.cmd)
            .args(&input.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match timeout(duration, output_future).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(
                    "Process {} timed out after {}ms",
                    input.cmd,
                    duration.as_millis()
                );
                return Err(HandlerError::failed(format!(
                    "process {:?} timed out after {}ms",
                    input.cmd,
                    duration.as_millis()
                )));
            }
        };

        tracing::debug!("Process exit code: {:?}", output.status.code());

        Ok(json!({
            "code": output.status.code(),
            "stdout": String::from_utf8_lossy(&output.stdout),
            "stderr": String::from_utf8_lossy(&output.stderr),
        }))
    }
}

pub fn register(router: &Router, policy: &Arc<Policy>) -> KernelResult<()> {
    router.handle(EXEC_METHOD, ExecHandler::new(Arc::clone(policy)))
}
