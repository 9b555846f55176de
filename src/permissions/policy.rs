//! Policy engine
//!
//! One [`Policy`] exists per running application. It is built once from the
//! declared configuration and then only read, apart from [`Policy::allow_dir`]
//! which appends a directory the user picked in a native dialog.
//!
//! Every capability family is governed by exactly one thing at check time:
//! - `fs`: the `fs` scope when declared, otherwise the allowed-directory list
//! - `http`: the `http` scope when declared, otherwise allowed
//! - `process`: the `process` scope when declared, otherwise denied
//! - everything else: the coarse capability flag

use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use super::capability::Capability;
use super::config::{AppConfig, PolicySeeds};
use super::scope::{FsScope, HostVerdict, HttpScope, ProcessScope};
use crate::core::RejectionError;
use crate::resolve::{absolutize, canonicalize_candidate, to_slash, ResolvedPath, VarSource};

/// Operating mode of a policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Every check passes; development only
    Permissive,
    /// Allow-list driven
    Restricted,
}

/// Filesystem access direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsAccess {
    Read,
    Write,
}

impl FsAccess {
    fn verb(&self) -> &'static str {
        match self {
            FsAccess::Read => "read",
            FsAccess::Write => "write",
        }
    }
}

/// Effective permissions of one application instance
#[derive(Debug)]
pub struct Policy {
    mode: Mode,
    capabilities: BTreeSet<Capability>,
    fs_scope: Option<FsScope>,
    http_scope: Option<HttpScope>,
    process_scope: Option<ProcessScope>,
    allowed_dirs: RwLock<Vec<PathBuf>>,
    vars: VarSource,
}

/// Serializable snapshot returned by `policy.describe`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicySummary {
    pub mode: Mode,
    pub capabilities: Vec<Capability>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fs: Option<FsScope>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpScope>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process: Option<ProcessScope>,
    pub allowed_directories: Vec<String>,
}

impl Policy {
    fn with_mode(mode: Mode, vars: VarSource) -> Self {
        Self {
            mode,
            capabilities: BTreeSet::new(),
            fs_scope: None,
            http_scope: None,
            process_scope: None,
            allowed_dirs: RwLock::new(Vec::new()),
            vars,
        }
    }

    /// A policy that allows everything
    ///
    /// **WARNING**: Only for local development. Never ship this.
    pub fn permissive(vars: VarSource) -> Self {
        Self::with_mode(Mode::Permissive, vars)
    }

    /// An empty restricted policy: denies everything except unscoped http
    pub fn restricted(vars: VarSource) -> Self {
        Self::with_mode(Mode::Restricted, vars)
    }

    /// Build the policy described by an application config
    pub fn from_config(config: &AppConfig, seeds: &PolicySeeds) -> Self {
        let vars = VarSource::live(config.identifier.clone(), seeds.project_dir.clone());

        let Some(perms) = &config.permissions else {
            tracing::warn!(
                "No permissions declared for '{}': running in PERMISSIVE mode",
                config.identifier
            );
            return Self::permissive(vars);
        };

        let mut policy = Self::restricted(vars);
        for cap in &perms.capabilities {
            policy.capabilities.insert(*cap);
        }
        policy.fs_scope = perms.fs.clone();
        policy.http_scope = perms.http.clone();
        policy.process_scope = perms.process.clone();
        policy = policy.with_seed_dirs(&config.identifier, seeds);

        tracing::info!(
            "Restricted policy for '{}': capabilities={:?} fs_scope={} http_scope={} process_scope={}",
            config.identifier,
            policy.capabilities,
            policy.fs_scope.is_some(),
            policy.http_scope.is_some(),
            policy.process_scope.is_some()
        );

        policy
    }

    /// Seed the fallback directory list: project, app data (both platform
    /// variants) and temp
    fn with_seed_dirs(self, identifier: &str, seeds: &PolicySeeds) -> Self {
        let app_dir = |base: Option<PathBuf>| base.map(|b| b.join(identifier));
        let candidates = [
            seeds.project_dir.clone(),
            app_dir(dirs::data_dir()),
            app_dir(dirs::data_local_dir()),
            Some(seeds.temp_dir.clone().unwrap_or_else(std::env::temp_dir)),
        ];

        candidates
            .into_iter()
            .flatten()
            .fold(self, |policy, dir| policy.with_allowed_dir(dir))
    }

    // Builder methods

    pub fn with_capability(mut self, cap: Capability) -> Self {
        self.capabilities.insert(cap);
        self
    }

    pub fn with_fs_scope(mut self, scope: FsScope) -> Self {
        self.fs_scope = Some(scope);
        self
    }

    pub fn with_http_scope(mut self, scope: HttpScope) -> Self {
        self.http_scope = Some(scope);
        self
    }

    pub fn with_process_scope(mut self, scope: ProcessScope) -> Self {
        self.process_scope = Some(scope);
        self
    }

    pub fn with_allowed_dir(self, dir: impl AsRef<Path>) -> Self {
        self.allow_dir(dir);
        self
    }

    // Accessors

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_permissive(&self) -> bool {
        self.mode == Mode::Permissive
    }

    pub fn fs_scope(&self) -> Option<&FsScope> {
        self.fs_scope.as_ref()
    }

    pub fn http_scope(&self) -> Option<&HttpScope> {
        self.http_scope.as_ref()
    }

    pub fn process_scope(&self) -> Option<&ProcessScope> {
        self.process_scope.as_ref()
    }

    pub fn allowed_dirs(&self) -> Vec<PathBuf> {
        self.allowed_dirs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Append a directory to the fallback allow-list
    ///
    /// Called when the user picks a directory in a native dialog. The
    /// directory is canonicalized first; duplicates are ignored.
    pub fn allow_dir(&self, dir: impl AsRef<Path>) -> PathBuf {
        let canonical = canonicalize_candidate(dir.as_ref());
        let mut dirs = self
            .allowed_dirs
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if !dirs.contains(&canonical) {
            tracing::info!("Allowing directory: {}", canonical.display());
            dirs.push(canonical.clone());
        }
        canonical
    }

    pub fn summary(&self) -> PolicySummary {
        PolicySummary {
            mode: self.mode,
            capabilities: self.capabilities.iter().copied().collect(),
            fs: self.fs_scope.clone(),
            http: self.http_scope.clone(),
            process: self.process_scope.clone(),
            allowed_directories: self.allowed_dirs().iter().map(|d| to_slash(d)).collect(),
        }
    }

    // Checks

    /// Coarse capability check
    pub fn check(&self, cap: Capability) -> Result<(), RejectionError> {
        if self.is_permissive() || self.capabilities.contains(&cap) {
            return Ok(());
        }

        Err(self.deny(RejectionError::new(
            cap.as_str(),
            format!("use the '{}' capability", cap),
            self.capabilities.iter().map(|c| c.to_string()).collect(),
            "permissions.capabilities",
        )))
    }

    /// Gate for a whole family before its scoped check runs
    ///
    /// A declared scope supersedes the coarse flag; `process` has no coarse
    /// flag and is left entirely to [`Policy::check_process`].
    pub fn check_family(&self, cap: Capability) -> Result<(), RejectionError> {
        let scoped = match cap {
            Capability::Fs => self.fs_scope.is_some(),
            Capability::Http => self.http_scope.is_some(),
            Capability::Process => true,
            _ => false,
        };
        if scoped {
            Ok(())
        } else {
            self.check(cap)
        }
    }

    /// Check a read; returns the path the handler must use
    pub fn check_fs_read(&self, raw: &str) -> Result<PathBuf, RejectionError> {
        self.check_fs(raw, FsAccess::Read)
    }

    /// Check a write; returns the path the handler must use
    pub fn check_fs_write(&self, raw: &str) -> Result<PathBuf, RejectionError> {
        self.check_fs(raw, FsAccess::Write)
    }

    pub fn check_fs(&self, raw: &str, access: FsAccess) -> Result<PathBuf, RejectionError> {
        let vars = self.vars.resolve();

        if self.is_permissive() {
            return Ok(absolutize(Path::new(vars.expand(raw).as_ref())));
        }

        let resolved = ResolvedPath::new(raw, &vars);
        let config_key = format!("permissions.fs.{}", access.verb());

        let (allowed, listed) = match &self.fs_scope {
            Some(scope) => {
                let patterns = match access {
                    FsAccess::Read => &scope.read,
                    FsAccess::Write => &scope.write,
                };
                let hit = patterns.iter().any(|p| resolved.matches(p, &vars));
                (hit, patterns.clone())
            }
            None => {
                let dirs = self.allowed_dirs();
                let hit = dirs.iter().any(|d| resolved.is_within(d));
                (hit, dirs.iter().map(|d| to_slash(d)).collect())
            }
        };

        if allowed {
            tracing::debug!(
                "fs {} allowed: {}",
                access.verb(),
                resolved.as_path().display()
            );
            return Ok(resolved.into_path_buf());
        }

        let resolved_str = to_slash(resolved.as_path());
        let attempted = if resolved_str == raw {
            format!("{} {:?}", access.verb(), raw)
        } else {
            format!("{} {:?} (resolves to {:?})", access.verb(), raw, resolved_str)
        };

        Err(self.deny(RejectionError::new(
            format!("fs.{}", access.verb()),
            attempted,
            listed,
            config_key,
        )))
    }

    /// Check an outbound request to `url`
    pub fn check_http(&self, url: &str) -> Result<(), RejectionError> {
        if self.is_permissive() {
            return Ok(());
        }

        // Unscoped network access is governed by the coarse flag alone
        let Some(scope) = &self.http_scope else {
            tracing::debug!("http allowed (no scope): {}", url);
            return Ok(());
        };

        let host = url::Url::parse(url)
            .ok()
            .and_then(|u| {
                u.host_str()
                    .map(|h| h.trim_start_matches('[').trim_end_matches(']').to_string())
            });

        let Some(host) = host else {
            return Err(self.deny(RejectionError::new(
                "http.request",
                format!("request {:?} (not a valid URL with a host)", url),
                self.http_allowed_list(),
                "permissions.http.allow",
            )));
        };

        match scope.evaluate(&host) {
            HostVerdict::Allowed => {
                tracing::debug!("http allowed: {}", host);
                Ok(())
            }
            HostVerdict::Denied(entry) => Err(self.deny(RejectionError::new(
                "http.request",
                format!(
                    "request {:?} (host {:?} matches deny entry {:?})",
                    url, host, entry
                ),
                self.http_allowed_list(),
                "permissions.http.deny",
            ))),
            HostVerdict::NotAllowed => Err(self.deny(RejectionError::new(
                "http.request",
                format!("request {:?} (host {:?})", url, host),
                self.http_allowed_list(),
                "permissions.http.allow",
            ))),
        }
    }

    fn http_allowed_list(&self) -> Vec<String> {
        match &self.http_scope {
            Some(scope) if scope.allow.is_empty() => {
                vec![format!("* except {:?}", scope.deny)]
            }
            Some(scope) => scope.allow.clone(),
            None => vec!["*".to_string()],
        }
    }

    /// Check execution of `cmd` with `args`
    ///
    /// Deny-by-default: without a process scope nothing may run. A single
    /// argument outside a rule's declared set rejects the whole call.
    pub fn check_process(&self, cmd: &str, args: &[String]) -> Result<(), RejectionError> {
        if self.is_permissive() {
            return Ok(());
        }

        let attempted = format!("execute {:?} with args {:?}", cmd, args);

        let Some(scope) = &self.process_scope else {
            return Err(self.deny(RejectionError::new(
                "process.exec",
                attempted,
                Vec::new(),
                "permissions.process.exec",
            )));
        };

        let mut rejected_arg = None;
        for rule in scope.rules_for(cmd) {
            match rule.first_rejected_arg(args) {
                None => {
                    tracing::debug!("process allowed: {} {:?}", cmd, args);
                    return Ok(());
                }
                Some(arg) => rejected_arg = rejected_arg.or(Some(arg)),
            }
        }

        let attempted = match rejected_arg {
            Some(arg) => format!("{} (argument {:?} is not declared)", attempted, arg),
            None => format!("{} (command not declared)", attempted),
        };

        Err(self.deny(RejectionError::new(
            "process.exec",
            attempted,
            scope.describe(),
            "permissions.process.exec",
        )))
    }

    fn deny(&self, err: RejectionError) -> RejectionError {
        tracing::warn!(
            method = %err.method,
            config_key = %err.config_key,
            "Permission denied: {}",
            err.attempted
        );
        err
    }
}
