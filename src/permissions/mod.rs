//! Permission model and policy engine
//!
//! This module decides, for every capability call, whether the running
//! application may perform it:
//! - **Capability**: coarse operation classes (`clipboard`, `dialog`, ...)
//! - **Scopes**: pattern-based narrowing of `fs`, `http` and `process`
//! - **Policy**: the per-application engine exposing typed checks
//!
//! ## Example
//!
//! ```rust,no_run
//! use capgate::permissions::{Capability, FsScope, Policy};
//! use capgate::resolve::VarSource;
//!
//! let policy = Policy::restricted(VarSource::live("com.example.app", None))
//!     .with_capability(Capability::Clipboard)
//!     .with_fs_scope(FsScope::new().with_read("$HOME/Documents/**"));
//!
//! assert!(policy.check(Capability::Clipboard).is_ok());
//! assert!(policy.check_fs_read("/etc/passwd").is_err());
//! ```

mod capability;
mod config;
mod policy;
mod scope;

pub use capability::{Capability, KNOWN_CAPABILITIES};
pub use config::{AppConfig, PermissionConfig, PolicySeeds};
pub use policy::{FsAccess, Mode, Policy, PolicySummary};
pub use scope::{FsScope, HostVerdict, HttpScope, ProcessRule, ProcessScope};
