//! Core types for the mediation kernel
//!
//! - `KernelError` - configuration and setup failures
//! - `RejectionError` - structured permission denial carried to the caller

pub mod error;
pub mod rejection;

pub use error::{KernelError, KernelResult};
pub use rejection::{ParseRejectionError, RejectionError, NOTHING_ALLOWED};
