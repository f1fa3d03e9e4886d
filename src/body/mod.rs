//! Request body, header, and URL construction.
//!
//! Walks an interface's body template, resolves every string leaf through
//! the template engine, and coerces typed leaves per the interface's
//! `field_types` map. Coercion is best-effort: a value that fails to parse
//! stays a string and the failure is logged, so a half-filled form still
//! produces an inspectable request.

use crate::config::{ConditionalBody, InterfaceSpec};
use crate::template::{self, ResolveContext};
use serde_json::Value;
use std::collections::HashMap;

/// Builds the outgoing request body for an interface.
///
/// A `conditional_body` takes precedence over the plain `body_template`: the
/// case is picked by the live UI value of its selector field, falling back
/// to the first declared case when no case matches.
pub fn build_body(iface: &InterfaceSpec, ctx: &ResolveContext) -> Value {
    let template = match &iface.conditional_body {
        Some(conditional) => select_case(conditional, ctx).unwrap_or(&iface.body_template),
        None => &iface.body_template,
    };

    build_value(template, None, &iface.field_types, ctx)
}

/// Resolves every header value template of an interface.
pub fn build_headers(iface: &InterfaceSpec, ctx: &ResolveContext) -> HashMap<String, String> {
    iface
        .headers
        .iter()
        .map(|(name, value)| (name.clone(), template::resolve(value, ctx)))
        .collect()
}

/// Resolves an interface's URL template.
pub fn build_url(iface: &InterfaceSpec, ctx: &ResolveContext) -> String {
    template::resolve(&iface.url, ctx)
}

/// Picks the conditional-body case for the selector field's live value.
fn select_case<'a>(conditional: &'a ConditionalBody, ctx: &ResolveContext) -> Option<&'a Value> {
    let selected = ctx
        .combo_inputs
        .get(&conditional.field)
        .or_else(|| ctx.field_inputs.get(&conditional.field))
        .filter(|v| !v.is_empty());

    if let Some(value) = selected {
        if let Some(case) = conditional.cases.get(value) {
            return Some(case);
        }
        log::warn!(
            "body: no case for '{}' = '{}'; using first declared case",
            conditional.field,
            value
        );
    }

    // Declaration order is preserved, so this is the first written case.
    conditional.cases.values().next()
}

/// Recursively builds one template node. `key` is the nearest enclosing
/// object key, used to look up the leaf's declared type.
fn build_value(
    template: &Value,
    key: Option<&str>,
    field_types: &HashMap<String, String>,
    ctx: &ResolveContext,
) -> Value {
    match template {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), build_value(v, Some(k), field_types, ctx)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| build_value(item, key, field_types, ctx))
                .collect(),
        ),
        Value::String(text) => {
            let resolved = template::resolve(text, ctx);
            match key.and_then(|k| field_types.get(k)) {
                Some(type_name) => coerce(&resolved, type_name, key.unwrap_or_default()),
                None => Value::String(resolved),
            }
        }
        other => other.clone(),
    }
}

/// Best-effort coercion of a resolved string to its declared type.
fn coerce(text: &str, type_name: &str, key: &str) -> Value {
    let trimmed = text.trim();
    match type_name.to_ascii_lowercase().as_str() {
        "int" => match trimmed.parse::<i64>() {
            Ok(n) => Value::Number(n.into()),
            Err(_) => keep_string(text, key, type_name),
        },
        "float" => match trimmed.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
            Some(n) => Value::Number(n),
            None => keep_string(text, key, type_name),
        },
        "bool" => match trimmed.to_ascii_lowercase().as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => keep_string(text, key, type_name),
        },
        _ => Value::String(text.to_string()),
    }
}

fn keep_string(text: &str, key: &str, type_name: &str) -> Value {
    log::warn!(
        "body: could not coerce '{}' to {} for key '{}'; keeping string",
        text,
        type_name,
        key
    );
    Value::String(text.to_string())
}
