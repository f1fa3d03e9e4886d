//! Product configuration loading and validation.
//!
//! Configuration is a per-product JSON document (see [`schema::ProductConfig`])
//! loaded from disk or handed over by the host. Shape problems in variable
//! values degrade silently elsewhere in the engine; structural problems in
//! the configuration itself are programming errors and are reported here.

pub mod schema;

pub use schema::{
    ConditionSpec, ConditionalBody, DataType, FieldSpec, FormulaSpec, FormulaType, InterfaceSpec,
    LayoutEntry, ProductConfig, ReferenceSpec, SqlSpec,
};

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;

/// Errors that can occur while loading a product configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Configuration file was not found at the given path.
    FileNotFound(String),

    /// Failed to parse JSON content.
    ParseError(String),

    /// Structurally invalid configuration (duplicate keys, dangling
    /// references).
    InvalidFormat(String),

    /// IO error occurred while reading the file.
    IoError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => {
                write!(f, "Product configuration not found: {}", path)
            }
            ConfigError::ParseError(msg) => {
                write!(f, "Failed to parse product configuration: {}", msg)
            }
            ConfigError::InvalidFormat(msg) => {
                write!(f, "Invalid product configuration: {}", msg)
            }
            ConfigError::IoError(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<io::Error> for ConfigError {
    fn from(err: io::Error) -> Self {
        ConfigError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Loads and validates a product configuration from a JSON file.
///
/// # Arguments
///
/// * `path` - Path to the per-product JSON document
///
/// # Returns
///
/// The validated configuration, or a [`ConfigError`] describing what is
/// wrong with the file.
pub fn load_product_config(path: &Path) -> Result<ProductConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let content = fs::read_to_string(path)?;
    parse_product_config(&content)
}

/// Parses and validates a product configuration from a JSON string.
pub fn parse_product_config(content: &str) -> Result<ProductConfig, ConfigError> {
    let config: ProductConfig = serde_json::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates structural invariants of a configuration.
///
/// Checked here because these are programming errors, distinct from the
/// degrade-to-blank handling applied to data-shape problems at resolve time:
///
/// - layout keys must be unique within the product
/// - interface/sql references must point at declared definitions
/// - a condition's `condition_field` must name a combo entry
pub fn validate_config(config: &ProductConfig) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for entry in &config.layout {
        if !seen.insert(entry.key().to_string()) {
            return Err(ConfigError::InvalidFormat(format!(
                "Duplicate layout key '{}'",
                entry.key()
            )));
        }

        match entry {
            LayoutEntry::Interface(r) => {
                if !config.interfaces.contains_key(&r.key) {
                    return Err(ConfigError::InvalidFormat(format!(
                        "Layout references undeclared interface '{}'",
                        r.key
                    )));
                }
            }
            LayoutEntry::Sql(r) => {
                if !config.sqls.contains_key(&r.key) {
                    return Err(ConfigError::InvalidFormat(format!(
                        "Layout references undeclared sql '{}'",
                        r.key
                    )));
                }
            }
            LayoutEntry::Condition(c) => {
                if !config.is_combo(&c.condition_field) {
                    return Err(ConfigError::InvalidFormat(format!(
                        "Condition '{}' references '{}' which is not a combo field",
                        c.key, c.condition_field
                    )));
                }
            }
            _ => {}
        }
    }

    Ok(())
}
