//! Exchange response handed back by the HTTP collaborator.

use serde_json::Value;
use std::collections::HashMap;

/// Raw response from one HTTP exchange, plus the optional decrypted body
/// produced by the external decrypt hop.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExchangeResponse {
    /// HTTP status code.
    pub status: u16,

    /// Response headers.
    pub headers: HashMap<String, String>,

    /// Raw response body bytes.
    pub body: Vec<u8>,

    /// Body after the external decrypt hop, when encryption was enabled.
    pub decrypted_body: Option<String>,
}

impl ExchangeResponse {
    /// Creates a response with the given status.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    /// Sets the raw body from a string.
    pub fn with_body(mut self, body: &str) -> Self {
        self.body = body.as_bytes().to_vec();
        self
    }

    /// Looks up a header value, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The body as UTF-8 text, lossily decoded. The decrypted body wins
    /// when present.
    pub fn body_text(&self) -> String {
        match &self.decrypted_body {
            Some(text) => text.clone(),
            None => String::from_utf8_lossy(&self.body).into_owned(),
        }
    }

    /// Parses the effective body as JSON, if it is JSON at all.
    pub fn json_body(&self) -> Option<Value> {
        serde_json::from_str(&self.body_text()).ok()
    }
}
