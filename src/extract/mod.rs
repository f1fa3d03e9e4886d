//! Response value extraction.
//!
//! Maps response-body JSON back into pool variables via multi-hop path
//! expressions. A path may use `|` or `->` as hop separators (falling back
//! to `.`), and string values that themselves contain JSON are transparently
//! re-parsed between hops, which handles gateways that double-encode their
//! payload field.
//!
//! Extraction is miss-tolerant: any failed hop returns `None`, and the
//! caller leaves the target variable unchanged. That differs deliberately
//! from condition resolution, which clears to `""` on a miss.

pub mod path;

use crate::template::{self, ResolveContext};
use serde_json::Value;

/// Extracts a value from a response body.
///
/// The path expression is template-resolved first, so it may embed variable
/// placeholders such as a dynamic array index (`items[{rowIndex}].id`).
///
/// # Arguments
///
/// * `body` - The parsed response body
/// * `path` - The raw path expression from the interface's response mapping
/// * `ctx` - Resolution context for placeholders inside the path
pub fn extract(body: &Value, path: &str, ctx: &ResolveContext) -> Option<Value> {
    let resolved = template::resolve(path, ctx);
    extract_path(body, &resolved)
}

/// Extracts a value along an already-resolved multi-hop path.
///
/// Hops split on `|` when present, else on `->`, else on `.`. Each hop gets
/// a `$.` prefix unless it already starts with `$`, then evaluates against
/// the current intermediate value. Between hops, a string intermediate that
/// starts with `{` or `[` after trimming is parsed as JSON; a parse failure
/// fails the whole extraction.
pub fn extract_path(body: &Value, path: &str) -> Option<Value> {
    let hops = split_hops(path);

    let mut current = body.clone();
    let count = hops.len();
    for (i, hop) in hops.into_iter().enumerate() {
        let expr = if hop.starts_with('$') {
            hop.to_string()
        } else {
            format!("$.{}", hop)
        };

        let matched = match path::evaluate_hop(&current, &expr) {
            Some(value) => value,
            None => {
                log::warn!("extract: no match for hop '{}' in path '{}'", hop, path);
                return None;
            }
        };

        current = if i + 1 < count {
            reparse_embedded_json(matched, path)?
        } else {
            matched
        };
    }

    Some(current)
}

/// Splits a path into hop expressions by separator precedence.
fn split_hops(path: &str) -> Vec<&str> {
    let parts: Vec<&str> = if path.contains('|') {
        path.split('|').collect()
    } else if path.contains("->") {
        path.split("->").collect()
    } else {
        path.split('.').collect()
    };

    parts
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Re-parses a string intermediate that carries JSON-encoded content.
fn reparse_embedded_json(value: Value, full_path: &str) -> Option<Value> {
    match value {
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.starts_with('{') || trimmed.starts_with('[') {
                match serde_json::from_str(trimmed) {
                    Ok(parsed) => Some(parsed),
                    Err(e) => {
                        log::warn!(
                            "extract: embedded JSON failed to parse in path '{}': {}",
                            full_path,
                            e
                        );
                        None
                    }
                }
            } else {
                Some(Value::String(text))
            }
        }
        other => Some(other),
    }
}
