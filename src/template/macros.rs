//! Self-contained macro placeholders: current date/time and random values.
//!
//! Macros expand without consulting the pool, so they run in their own phase
//! before any variable lookup. Supported forms:
//!
//! - `{dateTime}`, `{date}`, `{time}`
//! - `{dateTime:FORMAT}`, `{date:FORMAT}` with `yyyy/MM/dd HH:mm:ss`-style
//!   format tokens
//! - `{random:digits:N}`, `{random:string:N}`, `{random:alphanum:N}`

use chrono::Local;
use rand::Rng;

const DIGITS: &[u8] = b"0123456789";
const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const ALPHANUM: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Expands a macro placeholder name.
///
/// # Arguments
///
/// * `name` - The placeholder content without braces (e.g. `date:yyyyMMdd`)
///
/// # Returns
///
/// `Some(expansion)` when the name is a recognized macro, `None` otherwise
/// so later phases can treat the placeholder as a variable reference.
pub fn expand_macro(name: &str) -> Option<String> {
    let now = Local::now();

    match name {
        "dateTime" => return Some(now.format("%Y-%m-%d %H:%M:%S").to_string()),
        "date" => return Some(now.format("%Y-%m-%d").to_string()),
        "time" => return Some(now.format("%H:%M:%S").to_string()),
        _ => {}
    }

    if let Some(fmt) = name.strip_prefix("dateTime:") {
        return Some(now.format(&translate_format(fmt)).to_string());
    }
    if let Some(fmt) = name.strip_prefix("date:") {
        return Some(now.format(&translate_format(fmt)).to_string());
    }
    if let Some(spec) = name.strip_prefix("random:") {
        return expand_random(spec);
    }

    None
}

/// Expands `digits:N`, `string:N`, or `alphanum:N`.
fn expand_random(spec: &str) -> Option<String> {
    let (kind, len) = spec.split_once(':')?;
    let len: usize = len.trim().parse().ok()?;

    let charset: &[u8] = match kind {
        "digits" => DIGITS,
        "string" => LETTERS,
        "alphanum" => ALPHANUM,
        _ => return None,
    };

    let mut rng = rand::thread_rng();
    let value: String = (0..len)
        .map(|_| charset[rng.gen_range(0..charset.len())] as char)
        .collect();
    Some(value)
}

/// Translates `yyyy/MM/dd HH:mm:ss.SSS`-style tokens to a chrono format
/// string. Unknown characters pass through literally.
fn translate_format(fmt: &str) -> String {
    // Longest tokens first so "MM" is consumed before "mm" can see it.
    fmt.replace("yyyy", "%Y")
        .replace("SSS", "%3f")
        .replace("MM", "%m")
        .replace("dd", "%d")
        .replace("HH", "%H")
        .replace("mm", "%M")
        .replace("ss", "%S")
}
