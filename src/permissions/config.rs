//! Declarative application/permission configuration
//!
//! Configuration is JSON. An application without a `permissions` block runs
//! in permissive mode; any `permissions` block at all, even `{}`, switches to
//! restricted mode. Unknown keys are rejected so a misspelt scope cannot
//! silently fall back to a weaker default.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::capability::Capability;
use super::scope::{FsScope, HttpScope, ProcessScope};
use crate::core::{KernelError, KernelResult};

/// The `permissions` block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PermissionConfig {
    /// Coarse capabilities declared allowed
    #[serde(default)]
    pub capabilities: Vec<Capability>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fs: Option<FsScope>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpScope>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process: Option<ProcessScope>,
}

/// Application configuration as seen by the kernel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Reverse-DNS application identifier, names the app-data directory
    pub identifier: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<PermissionConfig>,
}

impl AppConfig {
    /// Create a permissive configuration
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            permissions: None,
        }
    }

    /// Set the permission block (switches to restricted mode)
    pub fn with_permissions(mut self, permissions: PermissionConfig) -> Self {
        self.permissions = Some(permissions);
        self
    }

    pub fn from_json_str(json: &str) -> KernelResult<Self> {
        let config: AppConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> KernelResult<Self> {
        tracing::info!("Loading application config from {}", path.display());
        let data = std::fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    pub fn validate(&self) -> KernelResult<()> {
        let id = self.identifier.trim();
        if id.is_empty() {
            return Err(KernelError::invalid_config("identifier must not be empty"));
        }
        if id.contains(['/', '\\']) || id == "." || id == ".." {
            return Err(KernelError::invalid_config(format!(
                "identifier '{}' must be a single path segment",
                id
            )));
        }

        if let Some(process) = self.permissions.as_ref().and_then(|p| p.process.as_ref()) {
            if let Some(rule) = process.exec.iter().find(|r| r.cmd.trim().is_empty()) {
                return Err(KernelError::invalid_config(format!(
                    "process rule with empty cmd (args: {:?})",
                    rule.args
                )));
            }
        }

        Ok(())
    }
}

/// Directories used to seed the fallback allow-list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicySeeds {
    pub project_dir: Option<PathBuf>,
    /// Overrides the OS temp directory
    pub temp_dir: Option<PathBuf>,
}

impl PolicySeeds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.project_dir = Some(dir.into());
        self
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Seeds for the current process: project dir is the working directory
    pub fn from_env() -> Self {
        Self {
            project_dir: std::env::current_dir().ok(),
            temp_dir: None,
        }
    }
}
