//! Product configuration schema.
//!
//! A product configuration document describes one API product: an ordered
//! `layout` of fields, combos, derived values and interface/SQL references,
//! plus the interface and SQL definitions they point at. The engine consumes
//! this document verbatim; rendering and persistence live in the host.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Declared data type of a field or combo, used for request-body coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[default]
    String,
    Int,
    Float,
    Bool,
}

/// Evaluation mode of a formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FormulaType {
    /// Arithmetic over numeric variables, rounded to 2 decimal places.
    #[default]
    Numeric,
    /// Difference in days between two date variables.
    Date,
}

fn default_show_in_ui() -> bool {
    true
}

/// A plain input field or combo selection in the layout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldSpec {
    /// Variable name this field publishes into the pool.
    pub key: String,

    /// Display label; cosmetic only.
    #[serde(default)]
    pub label: String,

    /// Declared type, consulted during body building.
    #[serde(default)]
    pub data_type: DataType,

    /// Default value expression. May itself contain placeholders.
    #[serde(default)]
    pub default: String,

    /// Combo options. Empty for plain fields.
    #[serde(default)]
    pub options: Vec<String>,

    /// When false the entity still exists in the pool and engine but has no
    /// visible widget.
    #[serde(default = "default_show_in_ui")]
    pub show_in_ui: bool,

    /// Display/evaluation order. Not a correctness dependency.
    #[serde(default)]
    pub priority: i32,
}

/// A derived variable that mirrors another variable chosen via a lookup
/// keyed by a combo field's current selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConditionSpec {
    /// Variable name this condition publishes.
    pub key: String,

    #[serde(default)]
    pub label: String,

    /// Key of the combo-type variable whose current value selects a mapping.
    pub condition_field: String,

    /// Condition-field value to source-variable key.
    #[serde(default)]
    pub mappings: HashMap<String, String>,

    #[serde(default = "default_show_in_ui")]
    pub show_in_ui: bool,

    #[serde(default)]
    pub priority: i32,
}

/// A derived variable computed from an expression over other variables.
///
/// The dependency set is always the set of `{name}` tokens textually present
/// in `formula`; it is computed by scanning, never stored, so it cannot go
/// stale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormulaSpec {
    /// Variable name this formula publishes.
    pub key: String,

    #[serde(default)]
    pub label: String,

    /// Expression text containing `{name}` tokens.
    pub formula: String,

    #[serde(default)]
    pub formula_type: FormulaType,

    #[serde(default = "default_show_in_ui")]
    pub show_in_ui: bool,

    #[serde(default)]
    pub priority: i32,
}

/// A layout entry referencing an interface or SQL definition by name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReferenceSpec {
    /// Name of the entry in the `interfaces` or `sqls` map.
    pub key: String,

    #[serde(default)]
    pub label: String,

    #[serde(default = "default_show_in_ui")]
    pub show_in_ui: bool,

    #[serde(default)]
    pub priority: i32,
}

/// One entry in the ordered product layout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LayoutEntry {
    Field(FieldSpec),
    Combo(FieldSpec),
    Interface(ReferenceSpec),
    Sql(ReferenceSpec),
    Condition(ConditionSpec),
    Formula(FormulaSpec),
}

impl LayoutEntry {
    /// The variable or reference key of this entry.
    pub fn key(&self) -> &str {
        match self {
            LayoutEntry::Field(f) | LayoutEntry::Combo(f) => &f.key,
            LayoutEntry::Interface(r) | LayoutEntry::Sql(r) => &r.key,
            LayoutEntry::Condition(c) => &c.key,
            LayoutEntry::Formula(f) => &f.key,
        }
    }

    /// Display/evaluation order.
    pub fn priority(&self) -> i32 {
        match self {
            LayoutEntry::Field(f) | LayoutEntry::Combo(f) => f.priority,
            LayoutEntry::Interface(r) | LayoutEntry::Sql(r) => r.priority,
            LayoutEntry::Condition(c) => c.priority,
            LayoutEntry::Formula(f) => f.priority,
        }
    }

    /// Whether this entry has a visible widget.
    pub fn show_in_ui(&self) -> bool {
        match self {
            LayoutEntry::Field(f) | LayoutEntry::Combo(f) => f.show_in_ui,
            LayoutEntry::Interface(r) | LayoutEntry::Sql(r) => r.show_in_ui,
            LayoutEntry::Condition(c) => c.show_in_ui,
            LayoutEntry::Formula(f) => f.show_in_ui,
        }
    }
}

/// A conditional (branching) body template.
///
/// The currently selected value of `field` (read live from UI inputs, not
/// the pool) selects the template under `cases`. When no case matches, the
/// first declared case is used; `cases` therefore preserves declaration
/// order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConditionalBody {
    /// Key of the field whose live value selects the case.
    pub field: String,

    /// Selector value to body template.
    pub cases: serde_json::Map<String, Value>,
}

fn default_method() -> String {
    "POST".to_string()
}

/// An outgoing interface definition: templates for the request plus the
/// response mapping that feeds extracted values back into the pool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InterfaceSpec {
    /// HTTP method. Defaults to POST, matching the payload-centric flow.
    #[serde(default = "default_method")]
    pub method: String,

    /// URL template.
    pub url: String,

    /// Header name to value template.
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Nested body template; string leaves may contain placeholders.
    #[serde(default)]
    pub body_template: Value,

    /// Optional branching body template. Takes precedence over
    /// `body_template` when present.
    #[serde(default)]
    pub conditional_body: Option<ConditionalBody>,

    /// Variable key to path expression, applied to the response body.
    #[serde(default)]
    pub response_mapping: HashMap<String, String>,

    /// Leaf key to declared type name (`int`/`float`/`bool`) for coercion.
    #[serde(default)]
    pub field_types: HashMap<String, String>,
}

/// A SQL definition executed by the external SQL collaborator.
///
/// The engine template-resolves `statement` and writes each declared output
/// column of the result rows into the pool; connection handling and
/// execution are external.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SqlSpec {
    /// Connection spec handed to the SQL collaborator, opaque to the engine.
    #[serde(default)]
    pub connection: String,

    /// SELECT statement template.
    pub statement: String,

    /// Output columns written into the pool, keyed by column name.
    /// Empty means every returned column.
    #[serde(default)]
    pub outputs: Vec<String>,
}

/// A complete per-product configuration document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ProductConfig {
    /// Ordered layout entries.
    #[serde(default)]
    pub layout: Vec<LayoutEntry>,

    /// Interface name to definition.
    #[serde(default)]
    pub interfaces: HashMap<String, InterfaceSpec>,

    /// SQL name to definition.
    #[serde(default)]
    pub sqls: HashMap<String, SqlSpec>,

    /// Whether request bodies pass through the external encrypt hop.
    #[serde(default)]
    pub enable_encryption: bool,

    /// Encrypt hop endpoint, consumed by the HTTP collaborator.
    #[serde(default)]
    pub encrypt_url: String,

    /// Decrypt hop endpoint, consumed by the HTTP collaborator.
    #[serde(default)]
    pub decrypt_url: String,
}

impl ProductConfig {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a field or combo entry by key.
    pub fn field(&self, key: &str) -> Option<&FieldSpec> {
        self.layout.iter().find_map(|entry| match entry {
            LayoutEntry::Field(f) | LayoutEntry::Combo(f) if f.key == key => Some(f),
            _ => None,
        })
    }

    /// Checks whether a key names a combo entry.
    pub fn is_combo(&self, key: &str) -> bool {
        self.layout
            .iter()
            .any(|entry| matches!(entry, LayoutEntry::Combo(f) if f.key == key))
    }

    /// Looks up a condition by key.
    pub fn condition(&self, key: &str) -> Option<&ConditionSpec> {
        self.conditions().find(|c| c.key == key)
    }

    /// Looks up a formula by key.
    pub fn formula(&self, key: &str) -> Option<&FormulaSpec> {
        self.formulas().find(|f| f.key == key)
    }

    /// Iterates over all condition entries in layout order.
    pub fn conditions(&self) -> impl Iterator<Item = &ConditionSpec> {
        self.layout.iter().filter_map(|entry| match entry {
            LayoutEntry::Condition(c) => Some(c),
            _ => None,
        })
    }

    /// Iterates over all formula entries in layout order.
    pub fn formulas(&self) -> impl Iterator<Item = &FormulaSpec> {
        self.layout.iter().filter_map(|entry| match entry {
            LayoutEntry::Formula(f) => Some(f),
            _ => None,
        })
    }

    /// Gets the configured default expression of a field or combo, if any.
    pub fn default_of(&self, key: &str) -> Option<&str> {
        self.field(key)
            .map(|f| f.default.as_str())
            .filter(|d| !d.is_empty())
    }

    /// Layout entries sorted by priority (stable within equal priorities).
    pub fn ordered_layout(&self) -> Vec<&LayoutEntry> {
        let mut entries: Vec<&LayoutEntry> = self.layout.iter().collect();
        entries.sort_by_key(|e| e.priority());
        entries
    }
}
