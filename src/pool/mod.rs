//! Variable pool for the templating engine.
//!
//! The pool is the single source of truth for every named value consumed by
//! template resolution: user field input, combo selections, SQL query output,
//! values extracted from HTTP responses, and values derived by conditions and
//! formulas. Reactive recompute is driven by the session layer; the pool
//! itself is a plain map with change reporting.

use serde_json::Value;
use std::collections::HashMap;

/// Where a pool value came from.
///
/// Provenance is informational: it lets hosts display the origin of a value
/// and lets tests assert that derived values were produced by the right
/// component. It does not affect resolution precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Typed directly into a UI field.
    UserField,
    /// Selected from a combo box.
    ComboSelection,
    /// A column from a SQL query result row.
    SqlOutput,
    /// Extracted from a previous HTTP response.
    ResponseExtraction,
    /// Derived by a condition lookup.
    ComputedCondition,
    /// Derived by a formula evaluation.
    ComputedFormula,
    /// Seeded from configuration or set by the host.
    Constant,
}

/// A single pool write, reported to observers.
#[derive(Debug, Clone)]
pub struct VariableChange {
    /// The variable name that was written.
    pub key: String,
    /// The previous value, if the variable existed before the write.
    pub old: Option<Value>,
    /// The value after the write.
    pub new: Value,
    /// Provenance of the write.
    pub provenance: Provenance,
}

/// Entry stored per variable.
#[derive(Debug, Clone)]
struct PoolEntry {
    value: Value,
    provenance: Provenance,
}

/// Central name-to-value store.
///
/// Accessed only from the single owning thread; there is no locking because
/// there is no concurrent access. Last write wins, no transactions.
#[derive(Debug, Default)]
pub struct VariablePool {
    entries: HashMap<String, PoolEntry>,
}

impl VariablePool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Gets the current value of a variable.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key).map(|e| &e.value)
    }

    /// Gets the current value of a variable, stringified for templating.
    ///
    /// Strings are returned without quotes; numbers and booleans use their
    /// canonical text form; null stringifies to the empty string.
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.get(key).map(value_to_string)
    }

    /// Gets the provenance of a variable, if present.
    pub fn provenance(&self, key: &str) -> Option<Provenance> {
        self.entries.get(key).map(|e| e.provenance)
    }

    /// Checks whether a variable exists.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Writes a variable and reports the change.
    ///
    /// Last write wins. The returned [`VariableChange`] carries the previous
    /// value so observers can diff.
    pub fn set(
        &mut self,
        key: impl Into<String>,
        value: Value,
        provenance: Provenance,
    ) -> VariableChange {
        let key = key.into();
        let old = self.entries.insert(
            key.clone(),
            PoolEntry {
                value: value.clone(),
                provenance,
            },
        );
        VariableChange {
            key,
            old: old.map(|e| e.value),
            new: value,
            provenance,
        }
    }

    /// Removes a variable, returning its value if it existed.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key).map(|e| e.value)
    }

    /// Replaces the entire contents of the pool.
    ///
    /// Used when the active product changes or configuration is reloaded.
    /// Reserved-key carry-over is the session's responsibility, not the
    /// pool's.
    pub fn reset(&mut self, initial: HashMap<String, Value>) {
        self.entries = initial
            .into_iter()
            .map(|(k, v)| {
                (
                    k,
                    PoolEntry {
                        value: v,
                        provenance: Provenance::Constant,
                    },
                )
            })
            .collect();
    }

    /// Iterates over all variable names.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    /// Returns the number of variables in the pool.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Checks whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Converts a pool value to its template string form.
///
/// - Strings: returned as-is (without quotes)
/// - Numbers, booleans: canonical text form
/// - Null: empty string
/// - Objects, arrays: serialized as JSON
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}
