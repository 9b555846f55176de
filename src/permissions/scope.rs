//! Declarative scopes narrowing the fs, http and process families

use serde::{Deserialize, Serialize};

use crate::resolve::match_domain;

/// Filesystem scope: path patterns for reads and writes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FsScope {
    #[serde(default)]
    pub read: Vec<String>,
    #[serde(default)]
    pub write: Vec<String>,
}

impl FsScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_read(mut self, pattern: impl Into<String>) -> Self {
        self.read.push(pattern.into());
        self
    }

    pub fn with_write(mut self, pattern: impl Into<String>) -> Self {
        self.write.push(pattern.into());
        self
    }
}

/// Network scope: host patterns, deny evaluated before allow
///
/// An empty `allow` list means every host not denied is allowed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpScope {
    #[serde(default)]
    pub allow: Vec<String>,
    #[serde(default)]
    pub deny: Vec<String>,
}

/// Outcome of evaluating a host against an [`HttpScope`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostVerdict {
    Allowed,
    /// Matched this deny entry
    Denied(String),
    /// Allow list present and nothing in it matched
    NotAllowed,
}

impl HttpScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_allow(mut self, pattern: impl Into<String>) -> Self {
        self.allow.push(pattern.into());
        self
    }

    pub fn with_deny(mut self, pattern: impl Into<String>) -> Self {
        self.deny.push(pattern.into());
        self
    }

    pub fn evaluate(&self, host: &str) -> HostVerdict {
        if let Some(hit) = self.deny.iter().find(|p| match_domain(host, p)) {
            return HostVerdict::Denied(hit.clone());
        }
        if self.allow.is_empty() || self.allow.iter().any(|p| match_domain(host, p)) {
            HostVerdict::Allowed
        } else {
            HostVerdict::NotAllowed
        }
    }
}

/// One allowed command and the argument tokens it may receive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProcessRule {
    pub cmd: String,
    /// Empty or `["*"]` accepts any arguments
    #[serde(default)]
    pub args: Vec<String>,
}

impl ProcessRule {
    pub fn new(cmd: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            cmd: cmd.into(),
            args,
        }
    }

    /// A rule accepting any arguments for `cmd`
    pub fn any_args(cmd: impl Into<String>) -> Self {
        Self::new(cmd, Vec::new())
    }

    pub fn accepts_any_args(&self) -> bool {
        self.args.is_empty() || (self.args.len() == 1 && self.args[0] == "*")
    }

    /// First argument outside the declared set, if any
    pub fn first_rejected_arg<'a>(&self, args: &'a [String]) -> Option<&'a str> {
        if self.accepts_any_args() {
            return None;
        }
        args.iter()
            .find(|a| !self.args.contains(*a))
            .map(String::as_str)
    }

    /// Rendering used in rejection messages, e.g. `git [status, log]`
    pub fn describe(&self) -> String {
        if self.accepts_any_args() {
            format!("{} [*]", self.cmd)
        } else {
            format!("{} [{}]", self.cmd, self.args.join(", "))
        }
    }
}

/// Process scope: the only commands content may execute
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProcessScope {
    #[serde(default)]
    pub exec: Vec<ProcessRule>,

    /// Default timeout applied to `process.exec` calls
    #[serde(default, rename = "timeoutMs")]
    pub timeout_ms: Option<u64>,
}

impl ProcessScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, rule: ProcessRule) -> Self {
        self.exec.push(rule);
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn rules_for<'a>(&'a self, cmd: &'a str) -> impl Iterator<Item = &'a ProcessRule> {
        self.exec.iter().filter(move |r| r.cmd == cmd)
    }

    pub fn describe(&self) -> Vec<String> {
        self.exec.iter().map(ProcessRule::describe).collect()
    }
}
