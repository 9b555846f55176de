//! Structured permission denials
//!
//! A [`RejectionError`] is built the moment a policy check fails and stays a
//! typed value until it is written into a response envelope. Its rendering is
//! line-oriented and stable because callers (including automated agents)
//! parse it to work out which configuration key to change:
//!
//! ```text
//! permission denied: fs.readTextFile
//!   attempted: read "/etc/passwd"
//!   allowed: ["$HOME/Documents/**"]
//!   change: permissions.fs.read
//! ```

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

const HEADER: &str = "permission denied: ";
const ATTEMPTED: &str = "  attempted: ";
const ALLOWED: &str = "  allowed: ";
const CHANGE: &str = "  change: ";

/// Rendered in place of an empty allowed list
pub const NOTHING_ALLOWED: &str = "none (nothing is declared for this capability)";

/// A capability call refused by the policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectionError {
    /// Dotted `namespace.method` of the refused call
    pub method: String,
    /// Human description of what was attempted
    pub attempted: String,
    /// Patterns, commands or capabilities currently allowed for this family
    pub allowed: Vec<String>,
    /// Configuration key that would have to change to permit the call
    pub config_key: String,
}

impl RejectionError {
    pub fn new(
        method: impl Into<String>,
        attempted: impl Into<String>,
        allowed: Vec<String>,
        config_key: impl Into<String>,
    ) -> Self {
        Self {
            method: method.into(),
            attempted: attempted.into(),
            allowed,
            config_key: config_key.into(),
        }
    }

    /// Re-label the rejection with the method that actually triggered it
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Namespace half of `method`
    pub fn namespace(&self) -> &str {
        self.method
            .split_once('.')
            .map(|(ns, _)| ns)
            .unwrap_or(&self.method)
    }

    fn render_allowed(&self) -> String {
        if self.allowed.is_empty() {
            return NOTHING_ALLOWED.to_string();
        }
        // A Vec<String> always serializes
        serde_json::to_string(&self.allowed).unwrap_or_default()
    }
}

impl fmt::Display for RejectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let attempted = if self.attempted.is_empty() {
            "(unspecified)"
        } else {
            self.attempted.as_str()
        };
        write!(
            f,
            "{HEADER}{}\n{ATTEMPTED}{}\n{ALLOWED}{}\n{CHANGE}{}",
            self.method,
            one_line(attempted),
            self.render_allowed(),
            self.config_key
        )
    }
}

impl std::error::Error for RejectionError {}

/// Returned when a string is not a rendered [`RejectionError`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("not a rejection message: {0}")]
pub struct ParseRejectionError(String);

impl FromStr for RejectionError {
    type Err = ParseRejectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut lines = s.lines();

        let method = lines
            .next()
            .and_then(|l| l.strip_prefix(HEADER))
            .ok_or_else(|| ParseRejectionError("missing header".into()))?;
        let attempted = field(lines.next(), ATTEMPTED)?;
        let allowed_raw = field(lines.next(), ALLOWED)?;
        let config_key = field(lines.next(), CHANGE)?;

        let allowed = if allowed_raw.starts_with('[') {
            serde_json::from_str(allowed_raw)
                .map_err(|e| ParseRejectionError(format!("bad allowed list: {}", e)))?
        } else {
            Vec::new()
        };

        Ok(Self {
            method: method.to_string(),
            attempted: attempted.to_string(),
            allowed,
            config_key: config_key.to_string(),
        })
    }
}

fn field<'a>(line: Option<&'a str>, prefix: &str) -> Result<&'a str, ParseRejectionError> {
    line.and_then(|l| l.strip_prefix(prefix))
        .ok_or_else(|| ParseRejectionError(format!("missing '{}' line", prefix.trim())))
}

fn one_line(s: &str) -> String {
    s.replace('\r', "\\r").replace('\n', "\\n")
}
