//! Condition resolution.
//!
//! A condition derives its value by looking up another variable, chosen via
//! a mapping table keyed by the current value of a combo field. An unmapped
//! combo value resolves to `""` rather than to any other field's value,
//! which prevents a stale value from one choice leaking into another.

use crate::template::ResolveContext;
use std::collections::HashSet;

/// Resolves a condition by key.
///
/// # Arguments
///
/// * `key` - The condition's variable key in the product layout
/// * `ctx` - Resolution context (pool, config, live inputs)
///
/// # Returns
///
/// - `None` when the key names no condition, or the condition field has no
///   current value (distinct from `""`)
/// - `Some("")` when the current value has no mapping entry
/// - `Some(value)` of the mapped source variable otherwise
pub fn resolve_condition(key: &str, ctx: &ResolveContext) -> Option<String> {
    let mut visiting = HashSet::new();
    resolve_guarded(key, ctx, 0, &mut visiting)
}

/// Guarded resolution shared with the template resolver.
///
/// Resolving the mapped source's default expression can reference this
/// condition again, so the condition key joins the `visiting` set for the
/// duration of the lookup; re-entry degrades to `""` instead of recursing.
pub(crate) fn resolve_guarded(
    key: &str,
    ctx: &ResolveContext,
    depth: usize,
    visiting: &mut HashSet<String>,
) -> Option<String> {
    let spec = ctx.config.condition(key)?;

    if !visiting.insert(key.to_string()) {
        log::warn!("condition: circular default chain through '{}'", key);
        return Some(String::new());
    }

    let current = match current_field_value(&spec.condition_field, ctx) {
        Some(value) => value,
        None => {
            visiting.remove(key);
            return None;
        }
    };

    let result = match spec.mappings.get(&current) {
        // Unmapped value: blank, never another mapping's source.
        None => String::new(),
        Some(source_key) => source_value(source_key, ctx, depth, visiting),
    };

    visiting.remove(key);
    Some(result)
}

/// Reads the live value of the condition field: combo selection first, then
/// the pool. Empty counts as absent.
fn current_field_value(field: &str, ctx: &ResolveContext) -> Option<String> {
    if let Some(value) = ctx.combo_inputs.get(field).filter(|v| !v.is_empty()) {
        return Some(value.clone());
    }
    ctx.pool.get_str(field).filter(|v| !v.is_empty())
}

/// Reads the mapped source variable: live inputs, then the pool, then the
/// source's resolved default, then blank. The default resolves under the
/// caller's recursion guard since it may reference further placeholders.
fn source_value(
    source_key: &str,
    ctx: &ResolveContext,
    depth: usize,
    visiting: &mut HashSet<String>,
) -> String {
    if let Some(value) = ctx.field_inputs.get(source_key).filter(|v| !v.is_empty()) {
        return value.clone();
    }
    if let Some(value) = ctx.combo_inputs.get(source_key).filter(|v| !v.is_empty()) {
        return value.clone();
    }
    if let Some(value) = ctx.pool.get_str(source_key) {
        return value;
    }
    if let Some(default) = ctx.config.default_of(source_key) {
        return crate::template::resolve_with_guard(default, ctx, depth + 1, visiting);
    }
    String::new()
}
