use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Coarse classes of OS-facing operations content may request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Capability {
    Fs,
    Http,
    Process,
    Clipboard,
    Dialog,
    Shell,
    Notification,
    Tray,
    Menu,
    Window,
}

/// All capability string values, in declaration order
pub const KNOWN_CAPABILITIES: &[&str] = &[
    "fs",
    "http",
    "process",
    "clipboard",
    "dialog",
    "shell",
    "notification",
    "tray",
    "menu",
    "window",
];

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Fs => "fs",
            Capability::Http => "http",
            Capability::Process => "process",
            Capability::Clipboard => "clipboard",
            Capability::Dialog => "dialog",
            Capability::Shell => "shell",
            Capability::Notification => "notification",
            Capability::Tray => "tray",
            Capability::Menu => "menu",
            Capability::Window => "window",
        }
    }

    /// Families that can be narrowed by an explicit scope
    pub fn is_scoped_family(&self) -> bool {
        matches!(self, Capability::Fs | Capability::Http | Capability::Process)
    }
}

impl FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fs" => Ok(Capability::Fs),
            "http" => Ok(Capability::Http),
            "process" => Ok(Capability::Process),
            "clipboard" => Ok(Capability::Clipboard),
            "dialog" => Ok(Capability::Dialog),
            "shell" => Ok(Capability::Shell),
            "notification" => Ok(Capability::Notification),
            "tray" => Ok(Capability::Tray),
            "menu" => Ok(Capability::Menu),
            "window" => Ok(Capability::Window),
            other => Err(format!(
                "unknown capability '{}' (expected one of: {})",
                other,
                KNOWN_CAPABILITIES.join(", ")
            )),
        }
    }
}

impl Serialize for Capability {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Capability {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse()
            .map_err(|_| serde::de::Error::unknown_variant(&s, KNOWN_CAPABILITIES))
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
