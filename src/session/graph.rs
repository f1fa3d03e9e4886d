//! Dependency graph over derived variables.
//!
//! Conditions and formulas are derived variables: a condition reads its
//! condition field plus every mapped source variable, a formula reads the
//! `{name}` tokens in its expression. The graph records those edges so a
//! pool write can recompute every *transitively* affected derived value in
//! topological order, not just direct dependents.

use crate::config::{LayoutEntry, ProductConfig};
use crate::formula;
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

/// Kind of derived variable a graph node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivedKind {
    Condition,
    Formula,
}

/// Static dependency graph built from a product configuration.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Derived key to its dependency keys. Ordered maps keep recompute
    /// order deterministic.
    deps: BTreeMap<String, BTreeSet<String>>,

    /// Derived key to node kind.
    kinds: BTreeMap<String, DerivedKind>,
}

impl DependencyGraph {
    /// Builds the graph from a configuration's conditions and formulas.
    pub fn from_config(config: &ProductConfig) -> Self {
        let mut graph = Self::default();

        for entry in &config.layout {
            match entry {
                LayoutEntry::Condition(c) => {
                    let mut deps: BTreeSet<String> =
                        c.mappings.values().cloned().collect();
                    deps.insert(c.condition_field.clone());
                    graph.deps.insert(c.key.clone(), deps);
                    graph.kinds.insert(c.key.clone(), DerivedKind::Condition);
                }
                LayoutEntry::Formula(f) => {
                    graph
                        .deps
                        .insert(f.key.clone(), formula::dependencies(&f.formula));
                    graph.kinds.insert(f.key.clone(), DerivedKind::Formula);
                }
                _ => {}
            }
        }

        graph
    }

    /// The node kind of a derived key, if the key is derived at all.
    pub fn kind(&self, key: &str) -> Option<DerivedKind> {
        self.kinds.get(key).copied()
    }

    /// The dependency keys of a derived variable.
    pub fn dependencies_of(&self, key: &str) -> Option<&BTreeSet<String>> {
        self.deps.get(key)
    }

    /// Derived keys that directly read `key`.
    pub fn direct_dependents(&self, key: &str) -> Vec<&str> {
        self.deps
            .iter()
            .filter(|(_, deps)| deps.contains(key))
            .map(|(derived, _)| derived.as_str())
            .collect()
    }

    /// All derived keys transitively affected by a write to `changed`, in
    /// an order where every dependency is recomputed before its dependents.
    ///
    /// A dependency cycle among derived values is a configuration error;
    /// the cyclic remainder is appended once, in key order, with a logged
    /// diagnostic, so evaluation still terminates.
    pub fn recompute_order(&self, changed: &str) -> Vec<String> {
        // Reachability pass: collect every transitively affected node.
        let mut affected: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        queue.push_back(changed);

        while let Some(key) = queue.pop_front() {
            for dependent in self.direct_dependents(key) {
                if affected.insert(dependent) {
                    queue.push_back(dependent);
                }
            }
        }

        if affected.is_empty() {
            return Vec::new();
        }

        // Kahn's algorithm restricted to the affected subgraph.
        let mut indegree: BTreeMap<&str, usize> = affected
            .iter()
            .map(|&key| {
                let within = self.deps[key]
                    .iter()
                    .filter(|dep| affected.contains(dep.as_str()))
                    .count();
                (key, within)
            })
            .collect();

        let mut ready: VecDeque<&str> = indegree
            .iter()
            .filter(|(_, &deg)| deg == 0)
            .map(|(&key, _)| key)
            .collect();

        let mut order = Vec::with_capacity(affected.len());
        while let Some(key) = ready.pop_front() {
            order.push(key.to_string());
            for dependent in self.direct_dependents(key) {
                if let Some(deg) = indegree.get_mut(dependent) {
                    if *deg > 0 {
                        *deg -= 1;
                        if *deg == 0 {
                            ready.push_back(dependent);
                        }
                    }
                }
            }
        }

        if order.len() < affected.len() {
            log::warn!(
                "graph: dependency cycle among derived variables reachable from '{}'",
                changed
            );
            let mut remainder: Vec<&str> = affected
                .iter()
                .filter(|key| !order.iter().any(|o| o == **key))
                .copied()
                .collect();
            remainder.sort_unstable();
            order.extend(remainder.into_iter().map(String::from));
        }

        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_product_config;
    use serde_json::json;

    fn config() -> ProductConfig {
        parse_product_config(
            &json!({
                "layout": [
                    {"type": "field", "key": "days"},
                    {"type": "combo", "key": "payType", "options": ["CARD"]},
                    {"type": "field", "key": "cardNo"},
                    {"type": "condition", "key": "acctNo", "condition_field": "payType",
                     "mappings": {"CARD": "cardNo"}},
                    {"type": "formula", "key": "fee", "formula": "{days}*2"},
                    {"type": "formula", "key": "total", "formula": "{fee}+{days}"}
                ]
            })
            .to_string(),
        )
        .unwrap()
    }

    #[test]
    fn test_condition_dependencies_include_sources() {
        let graph = DependencyGraph::from_config(&config());
        let deps = graph.dependencies_of("acctNo").unwrap();

        assert!(deps.contains("payType"));
        assert!(deps.contains("cardNo"));
        assert_eq!(graph.kind("acctNo"), Some(DerivedKind::Condition));
    }

    #[test]
    fn test_formula_dependencies_scanned() {
        let graph = DependencyGraph::from_config(&config());

        let deps = graph.dependencies_of("total").unwrap();
        assert!(deps.contains("fee"));
        assert!(deps.contains("days"));
        assert_eq!(graph.kind("fee"), Some(DerivedKind::Formula));
    }

    #[test]
    fn test_transitive_order() {
        let graph = DependencyGraph::from_config(&config());

        // days feeds fee, fee feeds total: both recompute, fee first.
        let order = graph.recompute_order("days");
        assert_eq!(order, vec!["fee".to_string(), "total".to_string()]);
    }

    #[test]
    fn test_direct_only_when_no_chain() {
        let graph = DependencyGraph::from_config(&config());

        assert_eq!(graph.recompute_order("fee"), vec!["total".to_string()]);
        assert!(graph.recompute_order("total").is_empty());
        assert!(graph.recompute_order("unrelated").is_empty());
    }

    #[test]
    fn test_condition_recomputes_on_source_change() {
        let graph = DependencyGraph::from_config(&config());

        assert_eq!(graph.recompute_order("cardNo"), vec!["acctNo".to_string()]);
        assert_eq!(graph.recompute_order("payType"), vec!["acctNo".to_string()]);
    }

    #[test]
    fn test_cycle_terminates() {
        let config = parse_product_config(
            &json!({
                "layout": [
                    {"type": "field", "key": "x"},
                    {"type": "formula", "key": "a", "formula": "{x}+{b}"},
                    {"type": "formula", "key": "b", "formula": "{a}"}
                ]
            })
            .to_string(),
        )
        .unwrap();
        let graph = DependencyGraph::from_config(&config);

        let order = graph.recompute_order("x");
        assert_eq!(order.len(), 2);
        assert!(order.contains(&"a".to_string()));
        assert!(order.contains(&"b".to_string()));
    }
}
