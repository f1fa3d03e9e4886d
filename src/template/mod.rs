//! Template resolution engine.
//!
//! This module provides the core substitution logic that replaces `{name}`
//! placeholders in request text (URLs, headers, JSON bodies, path
//! expressions) with resolved values from the variable pool, live UI inputs,
//! macros, and configured defaults. Resolution runs in strict phase order:
//!
//! 1. Array-index phase: `[{VAR}]` becomes `[N]` with the user-facing
//!    1-based value translated to a 0-based index.
//! 2. Macro phase: self-contained date/time and random placeholders.
//! 3. Known-producer phase: reserved payload keys, the request identifier,
//!    live field values, live combo selections.
//! 4. Pool phase: remaining names resolve from the pool, then from their
//!    configured default (recursively, with a recursion guard), then blank.
//! 5. Condition phase: remaining names matching a condition key resolve via
//!    the condition lookup.
//!
//! Order matters: later phases operate on text already partially
//! substituted. The resolver is pure and stateless given its inputs and is
//! cheap enough to run on every keystroke.

pub mod macros;

pub use macros::expand_macro;

use crate::condition;
use crate::config::ProductConfig;
use crate::pool::VariablePool;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::{HashMap, HashSet};

/// Maximum recursion depth for default-expression resolution.
const MAX_RECURSION_DEPTH: usize = 10;

/// Pool key of the per-session request identifier.
pub const REQUEST_ID_KEY: &str = "requestId";

/// Cached pattern for `[{VAR}]` array-index placeholders.
static ARRAY_INDEX_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\{([A-Za-z_][A-Za-z0-9_]*)\}\]").expect("Failed to compile array-index regex")
});

/// Cached pattern for `{name}` placeholders. `[^{}]+` keeps the match inside
/// a single brace pair so JSON body braces are left alone.
static PLACEHOLDER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([^{}]+)\}").expect("Failed to compile placeholder regex"));

/// Cached pattern for identifier-only `{name}` placeholders. Phases 3-5 use
/// this narrower class so non-identifier brace contents (e.g. a literal JSON
/// object) are left alone rather than swallowed to blank.
static NAME_PLACEHOLDER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("Failed to compile name placeholder regex")
});

/// Values owned by the session that resolve ahead of the pool: the request
/// identifier and reserved binary/base64 payload placeholders.
#[derive(Debug, Clone, Default)]
pub struct ReservedValues {
    /// Per-session request identifier, regenerated on product switch.
    pub request_id: String,

    /// Reserved payload placeholders (base64-encoded binary content set by
    /// the host, e.g. an uploaded image).
    pub payloads: HashMap<String, String>,
}

impl ReservedValues {
    /// Stores a binary payload under a reserved key, base64-encoded.
    pub fn set_binary(&mut self, key: impl Into<String>, bytes: &[u8]) {
        use base64::Engine;
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        self.payloads.insert(key.into(), encoded);
    }
}

/// Everything a resolution pass may read. Borrowed from the session (or
/// assembled by hand in tests); the resolver itself holds no state.
#[derive(Clone, Copy)]
pub struct ResolveContext<'a> {
    /// The variable pool.
    pub pool: &'a VariablePool,

    /// The active product configuration (defaults, conditions).
    pub config: &'a ProductConfig,

    /// Live UI field values, keyed by field key.
    pub field_inputs: &'a HashMap<String, String>,

    /// Live combo selections, keyed by combo key.
    pub combo_inputs: &'a HashMap<String, String>,

    /// Session-owned reserved values.
    pub reserved: &'a ReservedValues,
}

impl<'a> ResolveContext<'a> {
    /// Creates a context over the given sources.
    pub fn new(
        pool: &'a VariablePool,
        config: &'a ProductConfig,
        field_inputs: &'a HashMap<String, String>,
        combo_inputs: &'a HashMap<String, String>,
        reserved: &'a ReservedValues,
    ) -> Self {
        Self {
            pool,
            config,
            field_inputs,
            combo_inputs,
            reserved,
        }
    }
}

/// Resolves all placeholders in `text`.
///
/// Every occurrence of a placeholder is substituted, not just the first.
/// Unresolvable names degrade to `""` (or `"0"` for index-suffixed names)
/// rather than erroring, so the operator can inspect the generated request.
///
/// # Examples
///
/// ```
/// use apiforge::config::ProductConfig;
/// use apiforge::pool::{Provenance, VariablePool};
/// use apiforge::template::{resolve, ResolveContext, ReservedValues};
/// use std::collections::HashMap;
///
/// let mut pool = VariablePool::new();
/// pool.set("userId", serde_json::json!("42"), Provenance::UserField);
///
/// let config = ProductConfig::new();
/// let fields = HashMap::new();
/// let combos = HashMap::new();
/// let reserved = ReservedValues::default();
/// let ctx = ResolveContext::new(&pool, &config, &fields, &combos, &reserved);
///
/// assert_eq!(resolve("/users/{userId}", &ctx), "/users/42");
/// ```
pub fn resolve(text: &str, ctx: &ResolveContext) -> String {
    // Fast path for plain text; the resolver runs on every keystroke.
    if !text.contains('{') {
        return text.to_string();
    }
    let mut visiting = HashSet::new();
    resolve_with_guard(text, ctx, 0, &mut visiting)
}

/// Internal resolution with depth tracking for default-expression recursion.
/// Shared with condition resolution so the guard survives the hop through a
/// mapped source's default expression.
pub(crate) fn resolve_with_guard(
    text: &str,
    ctx: &ResolveContext,
    depth: usize,
    visiting: &mut HashSet<String>,
) -> String {
    if depth >= MAX_RECURSION_DEPTH {
        log::warn!("template: max recursion depth reached resolving defaults; stopping");
        return text.to_string();
    }

    // Phase 1: array indices.
    let text = ARRAY_INDEX_REGEX.replace_all(text, |caps: &Captures| {
        let name = &caps[1];
        format!("[{}]", array_index_value(name, ctx, depth, visiting))
    });

    // Phase 2: macros. Unrecognized names pass through untouched.
    let text = PLACEHOLDER_REGEX.replace_all(&text, |caps: &Captures| {
        expand_macro(&caps[1]).unwrap_or_else(|| caps[0].to_string())
    });

    // Phases 3-5: known producers, pool with default fallback, conditions.
    let text = NAME_PLACEHOLDER_REGEX.replace_all(&text, |caps: &Captures| {
        lookup_placeholder(&caps[1], ctx, depth, visiting)
    });

    text.into_owned()
}

/// Resolves one placeholder name through the fixed producer priority.
fn lookup_placeholder(
    name: &str,
    ctx: &ResolveContext,
    depth: usize,
    visiting: &mut HashSet<String>,
) -> String {
    // Phase 3: known producers, fixed priority. Empty live inputs count as
    // unresolved so configured defaults still apply.
    if let Some(value) = ctx.reserved.payloads.get(name) {
        return value.clone();
    }
    if name == REQUEST_ID_KEY && !ctx.reserved.request_id.is_empty() {
        return ctx.reserved.request_id.clone();
    }
    if let Some(value) = ctx.field_inputs.get(name).filter(|v| !v.is_empty()) {
        return value.clone();
    }
    if let Some(value) = ctx.combo_inputs.get(name).filter(|v| !v.is_empty()) {
        return value.clone();
    }

    // Phase 4: pool value, verbatim even when empty.
    if let Some(value) = ctx.pool.get_str(name) {
        return value;
    }

    // Phase 5: condition keys not yet published into the pool.
    if ctx.config.condition(name).is_some() {
        return condition::resolve_guarded(name, ctx, depth, visiting).unwrap_or_default();
    }

    // Default expression, resolved recursively with a cycle guard.
    if let Some(default) = ctx.config.default_of(name) {
        if visiting.insert(name.to_string()) {
            let resolved = resolve_with_guard(default, ctx, depth + 1, visiting);
            visiting.remove(name);
            return resolved;
        }
        log::warn!("template: circular default detected for '{}'", name);
        return String::new();
    }

    if is_index_name(name) {
        return "0".to_string();
    }

    String::new()
}

/// Computes the 0-based emitted index for one `[{VAR}]` occurrence.
///
/// The user-facing value is 1-based; negative results clamp to 0 with a
/// diagnostic. Unresolved names fall back to the declared default, else 0.
fn array_index_value(
    name: &str,
    ctx: &ResolveContext,
    depth: usize,
    visiting: &mut HashSet<String>,
) -> i64 {
    let raw = lookup_placeholder(name, ctx, depth, visiting);
    if raw.is_empty() {
        return 0;
    }

    match raw.trim().parse::<i64>() {
        Ok(n) => {
            let index = n - 1;
            if index < 0 {
                log::warn!(
                    "template: array index '{}' resolved to {} (1-based); clamping to 0",
                    name,
                    n
                );
                0
            } else {
                index
            }
        }
        Err(_) => {
            log::warn!(
                "template: array index '{}' resolved to non-numeric '{}'; using 0",
                name,
                raw
            );
            0
        }
    }
}

/// Names with an index suffix fall back to `"0"` instead of `""` so emitted
/// path expressions stay well-formed.
fn is_index_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with("index") || lower.ends_with("idx")
}
