//! Outbound HTTP handler
//!
//! Redirects are re-checked against the policy hop by hop, so an allowed
//! host cannot bounce a request to a denied one.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{redirect, Client, Method};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::{KernelError, KernelResult, RejectionError};
use crate::permissions::{Capability, Policy};
use crate::router::{parse_params, Handler, HandlerError, HandlerResult, Router};

pub const FETCH_METHOD: &str = "http.fetch";

const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const MAX_REDIRECTS: usize = 10;

/// Input for `http.fetch`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FetchInput {
    url: String,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    #[serde(default)]
    body: Option<String>,
    timeout_ms: Option<u64>,
}

/// Performs checked HTTP requests with reqwest
pub struct FetchHandler {
    policy: Arc<Policy>,
    client: Client,
}

impl FetchHandler {
    pub fn new(policy: Arc<Policy>) -> KernelResult<Self> {
        let client = Client::builder()
            .redirect(Self::redirect_policy(Arc::clone(&policy)))
            .build()
            .map_err(|e| KernelError::other(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self::with_client(policy, client))
    }

    /// Use a preconfigured client; its redirect policy is the caller's concern
    pub fn with_client(policy: Arc<Policy>, client: Client) -> Self {
        Self { policy, client }
    }

    fn redirect_policy(policy: Arc<Policy>) -> redirect::Policy {
        redirect::Policy::custom(move |attempt| {
            if attempt.previous().len() >= MAX_REDIRECTS {
                attempt.error("too many redirects")
            } else {
                match policy.check_http(attempt.url().as_str()) {
                    Ok(()) => attempt.follow(),
                    Err(rejection) => attempt.error(rejection.with_method(FETCH_METHOD)),
                }
            }
        })
    }
}

#[async_trait]
impl Handler for FetchHandler {
    async fn call(&self, params: Value) -> HandlerResult {
        let input: FetchInput = parse_params(params)?;
        self.policy
            .check_family(Capability::Http)
            .and_then(|_| self.policy.check_http(&input.url))
            .map_err(|e| e.with_method(FETCH_METHOD))?;

        let method_name = input.method.as_deref().unwrap_or("GET").to_ascii_uppercase();
        let method = Method::from_bytes(method_name.as_bytes())
            .map_err(|_| HandlerError::InvalidParams(format!("bad HTTP method: {}", method_name)))?;
        let timeout = Duration::from_millis(input.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS));

        tracing::info!("Fetching {} {}", method, input.url);

        let mut request = self.client.request(method, &input.url).timeout(timeout);
        for (name, value) in &input.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = input.body {
            request = request.body(body);
        }

        let response = request
            .send()
            .await
            .map_err(send_error)?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();
        let body = response
            .text()
            .await
            .map_err(|e| HandlerError::failed(format!("failed to read body: {}", e)))?;

        tracing::debug!("Fetch {} returned {} ({} bytes)", input.url, status, body.len());

        Ok(json!({
            "status": status,
            "url": final_url,
            "headers": headers,
            "body": body,
        }))
    }
}

/// A redirect refused by the policy surfaces as the rejection itself
fn send_error(err: reqwest::Error) -> HandlerError {
    let mut source = std::error::Error::source(&err);
    while let Some(cause) = source {
        if let Some(rejection) = cause.downcast_ref::<RejectionError>() {
            return HandlerError::Rejected(rejection.clone());
        }
        source = cause.source();
    }
    HandlerError::failed(format!("request failed: {}", err))
}

pub fn register(router: &Router, policy: &Arc<Policy>) -> KernelResult<()> {
    router.handle(FETCH_METHOD, FetchHandler::new(Arc::clone(policy))?)
}
