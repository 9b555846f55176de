//! Wire message shapes
//!
//! ```text
//! request:  { "id": "7", "method": "fs.readTextFile", "params": { ... } }
//! response: { "id": "7", "result": <any|null>, "error": "<string, omitted on success>" }
//! event:    { "event": "app.updated", "data": { ... } }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inbound capability call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Correlation identifier echoed in the response
    pub id: String,
    /// Dotted `namespace.verb`
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl Request {
    pub fn new(id: impl Into<String>, method: impl Into<String>, params: Value) -> Self {
        Self {
            id: id.into(),
            method: method.into(),
            params,
        }
    }
}

/// Reply to exactly one [`Request`]; `result` is null whenever `error` is set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub id: String,
    #[serde(default)]
    pub result: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn success(id: impl Into<String>, result: Value) -> Self {
        Self {
            id: id.into(),
            result,
            error: None,
        }
    }

    pub fn error(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            result: Value::Null,
            error: Some(message.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Serialize for the transport
    pub fn encode(&self) -> String {
        // Strings and serde_json::Value always serialize
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Server-to-content notification; carries no correlation id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl Event {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
