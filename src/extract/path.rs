//! Single-hop path expression parsing and evaluation.
//!
//! A hop is a dotted field path with optional bracketed array indices, e.g.
//! `data.users[0].name`. Evaluation is miss-tolerant: any absent field or
//! out-of-bounds index yields `None` instead of an error.

use serde_json::Value;

/// One segment of a path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Object field access (e.g. `user`, `name`).
    Field(String),

    /// Array index access (e.g. `[0]`, `[5]`).
    Index(usize),
}

/// Parses a path (without leading `$` or `.`) into segments.
///
/// # Examples
///
/// - `user.name` -> `[Field("user"), Field("name")]`
/// - `items[0].id` -> `[Field("items"), Index(0), Field("id")]`
pub fn parse_segments(path: &str) -> Vec<PathSegment> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '.' => {
                if !current.is_empty() {
                    segments.push(PathSegment::Field(current.clone()));
                    current.clear();
                }
            }
            '[' => {
                if !current.is_empty() {
                    segments.push(PathSegment::Field(current.clone()));
                    current.clear();
                }

                let mut index_str = String::new();
                while let Some(&next_ch) = chars.peek() {
                    if next_ch == ']' {
                        chars.next();
                        break;
                    }
                    index_str.push(next_ch);
                    chars.next();
                }

                if let Ok(index) = index_str.trim().parse::<usize>() {
                    segments.push(PathSegment::Index(index));
                }
            }
            _ => current.push(ch),
        }
    }

    if !current.is_empty() {
        segments.push(PathSegment::Field(current));
    }

    segments
}

/// Evaluates one hop expression against a JSON value.
///
/// Accepts an optional leading `$` (root reference) and dot. `$` alone
/// returns the value itself. Any miss returns `None`.
pub fn evaluate_hop(value: &Value, expr: &str) -> Option<Value> {
    let expr = expr.trim();
    let rest = expr.strip_prefix('$').unwrap_or(expr);
    let rest = rest.strip_prefix('.').unwrap_or(rest);

    if rest.is_empty() {
        return Some(value.clone());
    }

    let mut current = value;
    for segment in parse_segments(rest) {
        current = match segment {
            PathSegment::Field(name) => current.get(&name)?,
            PathSegment::Index(index) => current.get(index)?,
        };
    }

    Some(current.clone())
}
