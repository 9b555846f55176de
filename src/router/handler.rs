//! Capability handler trait
//!
//! A handler turns request params into a result value. Handlers touching the
//! filesystem, network or a subprocess run their policy check as the very
//! first statement and return the [`RejectionError`] unmodified.

use std::future::Future;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::core::RejectionError;

/// Failure of a single capability call, rendered into the response error
#[derive(Error, Debug)]
pub enum HandlerError {
    /// Denied by the policy; rendered exactly as the rejection renders
    #[error(transparent)]
    Rejected(#[from] RejectionError),

    /// Params did not match what the handler expects
    #[error("invalid params: {0}")]
    InvalidParams(String),

    /// OS error from the underlying operation, passed through as-is
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// Any other handler failure
    #[error("{0}")]
    Failed(String),
}

impl HandlerError {
    pub fn failed(msg: impl Into<String>) -> Self {
        HandlerError::Failed(msg.into())
    }

    pub fn rejection(&self) -> Option<&RejectionError> {
        match self {
            HandlerError::Rejected(r) => Some(r),
            _ => None,
        }
    }
}

pub type HandlerResult = Result<Value, HandlerError>;

/// Trait for capability handlers
#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, params: Value) -> HandlerResult;
}

/// Implement Handler for async closures
#[async_trait]
impl<F, Fut> Handler for F
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send,
{
    async fn call(&self, params: Value) -> HandlerResult {
        (self)(params).await
    }
}

/// Deserialize request params into a typed input
pub fn parse_params<T: DeserializeOwned>(params: Value) -> Result<T, HandlerError> {
    serde_json::from_value(params).map_err(|e| HandlerError::InvalidParams(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct PathInput {
        path: String,
    }

    #[test]
    fn test_rejection_renders_unchanged() {
        let rejection =
            RejectionError::new("fs.read", "read \"/x\"", vec![], "permissions.fs.read");
        let err: HandlerError = rejection.clone().into();
        assert_eq!(err.to_string(), rejection.to_string());
        assert_eq!(err.rejection(), Some(&rejection));
    }

    #[test]
    fn test_io_error_passes_through() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "No such file or directory");
        let err: HandlerError = io.into();
        assert_eq!(err.to_string(), "No such file or directory");
    }

    #[test]
    fn test_parse_params() {
        let input: PathInput = parse_params(json!({"path": "/a"})).unwrap();
        assert_eq!(input.path, "/a");

        let err = parse_params::<PathInput>(json!({})).unwrap_err();
        assert!(matches!(err, HandlerError::InvalidParams(_)));
    }

    #[tokio::test]
    async fn test_closure_handler() {
        let handler = |params: Value| async move { HandlerResult::Ok(json!({ "echo": params })) };
        let out = handler.call(json!(1)).await.unwrap();
        assert_eq!(out, json!({ "echo": 1 }));
    }
}
