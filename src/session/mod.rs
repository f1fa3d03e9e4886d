//! Product session: pool, configuration, and reactive recompute.
//!
//! A [`Session`] owns everything the host needs to drive one product's
//! request flow: the variable pool, the loaded configuration, live UI
//! inputs, reserved values, and the dependency graph. Hosts publish values
//! with `set_*` and observe pool writes through subscribed callbacks;
//! widgets never hold authoritative state.
//!
//! Every pool write recomputes the transitively affected conditions and
//! formulas in dependency order, so a formula depending on a condition
//! depending on a field settles in one pass.

pub mod graph;

use crate::condition;
use crate::config::ProductConfig;
use crate::formula;
use crate::models::{ExchangeResponse, ResolvedRequest};
use crate::pool::{Provenance, VariableChange, VariablePool};
use crate::template::{ReservedValues, ResolveContext};
use crate::{body, extract};
use graph::{DependencyGraph, DerivedKind};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// Callback invoked for every pool write, including derived recomputes.
pub type Observer = Box<dyn FnMut(&VariableChange)>;

/// One product's engine state.
pub struct Session {
    config: ProductConfig,
    pool: VariablePool,
    graph: DependencyGraph,
    reserved: ReservedValues,
    field_inputs: HashMap<String, String>,
    combo_inputs: HashMap<String, String>,
    observers: Vec<Observer>,
    generation: u64,
}

impl Session {
    /// Creates a session for a product configuration, seeding defaults and
    /// evaluating initial derived values.
    pub fn new(config: ProductConfig) -> Self {
        let mut session = Self {
            config: ProductConfig::new(),
            pool: VariablePool::new(),
            graph: DependencyGraph::default(),
            reserved: ReservedValues::default(),
            field_inputs: HashMap::new(),
            combo_inputs: HashMap::new(),
            observers: Vec::new(),
            generation: 0,
        };
        session.reset_for_product(config);
        session
    }

    /// Switches the session to a new product configuration.
    ///
    /// Pool contents, bindings, and live inputs are torn down wholesale.
    /// Only reserved values survive: binary payloads carry over and the
    /// request identifier is regenerated.
    pub fn reset_for_product(&mut self, config: ProductConfig) {
        self.graph = DependencyGraph::from_config(&config);
        self.config = config;
        self.pool = VariablePool::new();
        self.field_inputs.clear();
        self.combo_inputs.clear();
        self.reserved.request_id = Uuid::new_v4().simple().to_string();
        self.generation += 1;

        self.seed_defaults();
    }

    /// Seeds field/combo defaults in priority order, then evaluates every
    /// condition and formula once so derived values exist from the start.
    fn seed_defaults(&mut self) {
        let seeds: Vec<(String, String)> = self
            .config
            .ordered_layout()
            .iter()
            .filter_map(|entry| {
                let key = entry.key();
                self.config
                    .default_of(key)
                    .map(|default| (key.to_string(), default.to_string()))
            })
            .collect();

        for (key, default) in seeds {
            let resolved = crate::template::resolve(&default, &self.context());
            self.write_and_recompute(&key, Value::String(resolved), Provenance::Constant);
        }

        let derived: Vec<String> = self
            .config
            .ordered_layout()
            .iter()
            .filter(|entry| self.graph.kind(entry.key()).is_some())
            .map(|entry| entry.key().to_string())
            .collect();
        for key in derived {
            self.recompute_one(&key);
        }
    }

    /// Registers a pool-write observer.
    pub fn subscribe(&mut self, observer: impl FnMut(&VariableChange) + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// The variable pool.
    pub fn pool(&self) -> &VariablePool {
        &self.pool
    }

    /// The active product configuration.
    pub fn config(&self) -> &ProductConfig {
        &self.config
    }

    /// The dependency graph over derived variables.
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// The per-session request identifier.
    pub fn request_id(&self) -> &str {
        &self.reserved.request_id
    }

    /// The current request generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Stores a binary payload under a reserved placeholder key.
    pub fn set_binary_payload(&mut self, key: impl Into<String>, bytes: &[u8]) {
        self.reserved.set_binary(key, bytes);
    }

    /// A resolution context over this session's current state.
    pub fn context(&self) -> ResolveContext<'_> {
        ResolveContext::new(
            &self.pool,
            &self.config,
            &self.field_inputs,
            &self.combo_inputs,
            &self.reserved,
        )
    }

    /// Publishes a value into the pool and recomputes dependents.
    pub fn set_variable(&mut self, key: &str, value: Value, provenance: Provenance) {
        self.write_and_recompute(key, value, provenance);
    }

    /// Publishes a typed UI field value.
    pub fn set_field_input(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        self.field_inputs.insert(key.to_string(), value.clone());
        self.write_and_recompute(key, Value::String(value), Provenance::UserField);
    }

    /// Publishes a combo selection.
    pub fn set_combo_selection(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        self.combo_inputs.insert(key.to_string(), value.clone());
        self.write_and_recompute(key, Value::String(value), Provenance::ComboSelection);
    }

    /// Writes SQL result rows into the pool.
    ///
    /// Columns are filtered to the SQL spec's declared outputs; an empty
    /// declaration takes every returned column. Rows apply in order, so the
    /// last row wins on collision.
    pub fn apply_sql_rows(&mut self, sql_name: &str, rows: &[HashMap<String, Value>]) {
        let outputs = match self.config.sqls.get(sql_name) {
            Some(spec) => spec.outputs.clone(),
            None => {
                log::warn!("session: unknown sql '{}'", sql_name);
                return;
            }
        };

        for row in rows {
            let mut columns: Vec<&String> = row
                .keys()
                .filter(|col| outputs.is_empty() || outputs.contains(col))
                .collect();
            columns.sort_unstable();
            for col in columns {
                let value = row[col].clone();
                self.write_and_recompute(col, value, Provenance::SqlOutput);
            }
        }
    }

    /// Prepares a fully resolved request for an interface, tagging it with
    /// a fresh generation so stale completions can be discarded.
    pub fn prepare_request(&mut self, interface_name: &str) -> Option<ResolvedRequest> {
        let iface = self.config.interfaces.get(interface_name)?.clone();

        self.generation += 1;
        let ctx = self.context();
        Some(ResolvedRequest {
            method: iface.method.clone(),
            url: body::build_url(&iface, &ctx),
            headers: body::build_headers(&iface, &ctx),
            body: body::build_body(&iface, &ctx),
            generation: self.generation,
        })
    }

    /// Applies a completed exchange: runs the interface's response mapping
    /// and writes extracted values back into the pool.
    ///
    /// Returns the sorted list of variables the mapping actually wrote, so
    /// the host knows what to refresh. Returns `None` without touching the
    /// pool when the response's generation is no longer current (a newer
    /// request has been prepared since), or when the body is not JSON.
    /// Extraction misses leave their target variable unchanged.
    pub fn apply_response(
        &mut self,
        interface_name: &str,
        generation: u64,
        response: &ExchangeResponse,
    ) -> Option<Vec<String>> {
        if generation != self.generation {
            log::warn!(
                "session: discarding stale response for '{}' (generation {} != {})",
                interface_name,
                generation,
                self.generation
            );
            return None;
        }

        let mapping = match self.config.interfaces.get(interface_name) {
            Some(iface) => iface.response_mapping.clone(),
            None => {
                log::warn!("session: unknown interface '{}'", interface_name);
                return None;
            }
        };

        let json = match response.json_body() {
            Some(json) => json,
            None => {
                log::warn!(
                    "session: response for '{}' is not JSON; nothing extracted",
                    interface_name
                );
                return None;
            }
        };

        let mut targets: Vec<(&String, &String)> = mapping.iter().collect();
        targets.sort_unstable();
        let mut changed = Vec::new();
        for (variable, path) in targets {
            let extracted = extract::extract(&json, path, &self.context());
            if let Some(value) = extracted {
                self.write_and_recompute(variable, value, Provenance::ResponseExtraction);
                changed.push(variable.clone());
            }
        }

        Some(changed)
    }

    /// Core write path: one pool write, then transitive recompute of every
    /// affected derived variable in dependency order.
    fn write_and_recompute(&mut self, key: &str, value: Value, provenance: Provenance) {
        let change = self.pool.set(key, value, provenance);
        self.notify(&change);

        for derived in self.graph.recompute_order(key) {
            self.recompute_one(&derived);
        }
    }

    /// Re-evaluates one derived variable and publishes the result. Does not
    /// cascade; callers supply the full recompute order.
    fn recompute_one(&mut self, key: &str) {
        let computed = match self.graph.kind(key) {
            Some(DerivedKind::Condition) => condition::resolve_condition(key, &self.context())
                .map(|v| (Value::String(v), Provenance::ComputedCondition)),
            Some(DerivedKind::Formula) => self.config.formula(key).cloned().map(|spec| {
                let result = formula::evaluate(&spec, &self.context());
                (Value::String(result), Provenance::ComputedFormula)
            }),
            None => None,
        };

        if let Some((value, provenance)) = computed {
            let change = self.pool.set(key, value, provenance);
            self.notify(&change);
        }
    }

    fn notify(&mut self, change: &VariableChange) {
        for observer in &mut self.observers {
            observer(change);
        }
    }
}
