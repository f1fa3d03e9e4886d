//! Formula evaluation engine.
//!
//! A formula derives a numeric or date variable from an expression over
//! other variables, written with `{name}` tokens. The dependency set is the
//! set of tokens textually present in the formula. It is always computed by
//! scanning, so it can never diverge from what evaluation actually reads.
//!
//! Evaluation never propagates failure to the caller: a missing dependency
//! resolves silently to `""`, and a malformed formula resolves to `""` with
//! a logged diagnostic, so the operator can inspect the generated request.

pub mod date;
pub mod parser;

use crate::config::{FormulaSpec, FormulaType};
use crate::template::ResolveContext;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;

/// Cached pattern for `{name}` dependency tokens.
static TOKEN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("Failed to compile formula token regex")
});

/// Characters permitted in a substituted numeric formula.
const NUMERIC_CHARSET: &str = "0123456789+-*/(). %";

/// Errors that can occur during formula evaluation.
///
/// These never cross the engine boundary as `Err`; [`evaluate`] converts
/// them to `""` per the degrade-to-blank policy.
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaError {
    /// A dependency is absent from every source or empty.
    MissingDependency(String),
    /// The substituted text contains characters outside the whitelist.
    InvalidCharacters,
    /// A numeric formula contains no arithmetic operator.
    NoOperator,
    /// Arithmetic parsing or evaluation failed.
    Arithmetic(parser::ParseError),
    /// Date formula validation or parsing failed.
    Date(date::DateFormulaError),
}

impl fmt::Display for FormulaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormulaError::MissingDependency(name) => {
                write!(f, "Missing dependency: {}", name)
            }
            FormulaError::InvalidCharacters => {
                write!(f, "Formula contains characters outside 0-9 + - * / ( ) . % space")
            }
            FormulaError::NoOperator => {
                write!(f, "Numeric formula contains no + - * / operator")
            }
            FormulaError::Arithmetic(e) => write!(f, "Arithmetic error: {}", e),
            FormulaError::Date(e) => write!(f, "Date error: {}", e),
        }
    }
}

impl std::error::Error for FormulaError {}

impl From<parser::ParseError> for FormulaError {
    fn from(err: parser::ParseError) -> Self {
        FormulaError::Arithmetic(err)
    }
}

impl From<date::DateFormulaError> for FormulaError {
    fn from(err: date::DateFormulaError) -> Self {
        FormulaError::Date(err)
    }
}

/// Scans a formula for its `{name}` dependency tokens.
///
/// This *is* the live dependency set used for recompute triggering; there is
/// no stored copy that could go stale.
pub fn dependencies(formula: &str) -> BTreeSet<String> {
    TOKEN_REGEX
        .captures_iter(formula)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Evaluates a formula against the current context.
///
/// Returns the stringified result, or `""` when any dependency is absent or
/// empty (silent) or validation fails (logged). The caller publishes the
/// returned string into the pool under the formula's key.
pub fn evaluate(spec: &FormulaSpec, ctx: &ResolveContext) -> String {
    match try_evaluate(spec, ctx) {
        Ok(value) => value,
        Err(FormulaError::MissingDependency(_)) => String::new(),
        Err(err) => {
            log::warn!("formula '{}': {}", spec.key, err);
            String::new()
        }
    }
}

fn try_evaluate(spec: &FormulaSpec, ctx: &ResolveContext) -> Result<String, FormulaError> {
    let mut text = spec.formula.clone();

    for dep in dependencies(&spec.formula) {
        let value =
            dependency_value(&dep, ctx).ok_or_else(|| FormulaError::MissingDependency(dep.clone()))?;
        text = text.replace(&format!("{{{}}}", dep), &value);
    }

    match spec.formula_type {
        FormulaType::Numeric => evaluate_numeric(&text),
        FormulaType::Date => Ok(date::evaluate_date(&text)?.to_string()),
    }
}

/// Reads a dependency: live inputs first, then the pool. Empty counts as
/// absent so half-filled forms yield `""` instead of a bogus result.
fn dependency_value(name: &str, ctx: &ResolveContext) -> Option<String> {
    if let Some(value) = ctx.field_inputs.get(name).filter(|v| !v.is_empty()) {
        return Some(value.clone());
    }
    if let Some(value) = ctx.combo_inputs.get(name).filter(|v| !v.is_empty()) {
        return Some(value.clone());
    }
    ctx.pool.get_str(name).filter(|v| !v.is_empty())
}

/// Validates and evaluates a substituted numeric formula.
fn evaluate_numeric(text: &str) -> Result<String, FormulaError> {
    if !text.chars().all(|c| NUMERIC_CHARSET.contains(c)) {
        return Err(FormulaError::InvalidCharacters);
    }
    if !text.chars().any(|c| matches!(c, '+' | '-' | '*' | '/')) {
        return Err(FormulaError::NoOperator);
    }

    // Percent is shorthand for "divide by 100".
    let replaced = text.replace('%', "/100");
    let value = parser::evaluate(&replaced)?;
    Ok(format_rounded(value))
}

/// Rounds to 2 decimal places and trims trailing zeros, so `11.0` prints as
/// `11` and `11.50` as `11.5`.
fn format_rounded(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == 0.0 {
        // Collapses negative zero.
        return "0".to_string();
    }
    if rounded.fract() == 0.0 {
        // Formats integral magnitudes beyond i64 range correctly.
        format!("{:.0}", rounded)
    } else {
        let text = format!("{:.2}", rounded);
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}
