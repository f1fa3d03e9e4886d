//! Fully resolved outgoing request.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A request with every template already resolved, ready to hand to the
/// HTTP collaborator. The engine performs no transport itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolvedRequest {
    /// HTTP method (GET, POST, etc.).
    pub method: String,

    /// Fully resolved URL.
    pub url: String,

    /// Resolved header map.
    pub headers: HashMap<String, String>,

    /// Resolved JSON body. `Null` for bodyless requests.
    pub body: Value,

    /// Session generation this request was prepared under. A response tagged
    /// with an older generation than the session's current one is stale and
    /// must be discarded.
    pub generation: u64,
}

impl ResolvedRequest {
    /// Serializes the body for transport. `Null` becomes an empty string.
    pub fn body_text(&self) -> String {
        match &self.body {
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}
