//! Kernel error types

use thiserror::Error;

/// Errors raised while building or configuring the kernel
///
/// Capability denials are not represented here; they are a
/// [`RejectionError`](super::RejectionError) and travel through handlers.
#[derive(Error, Debug)]
pub enum KernelError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid permission or application configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A handler was registered under a name that is not `namespace.verb`
    #[error("Invalid method name: {0}")]
    InvalidMethod(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl KernelError {
    /// Create a generic error from a string
    pub fn other(msg: impl Into<String>) -> Self {
        KernelError::Other(msg.into())
    }

    /// Create a configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        KernelError::InvalidConfig(msg.into())
    }
}

/// Result type alias for kernel operations
pub type KernelResult<T> = Result<T, KernelError>;
