//! Property-based tests for formula dependency scanning and template
//! resolution.

use apiforge::config::ProductConfig;
use apiforge::formula::dependencies;
use apiforge::pool::VariablePool;
use apiforge::template::{resolve, ReservedValues, ResolveContext};
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};

proptest! {
    /// The dependency set of a formula is exactly the set of `{name}`
    /// tokens assembled into it, regardless of the literal text between
    /// them.
    #[test]
    fn dependencies_match_assembled_tokens(
        parts in prop::collection::vec(
            ("[a-z_][a-z0-9_]{0,8}", "[0-9+*/ ().-]{0,5}"),
            0..8,
        )
    ) {
        let mut formula = String::new();
        let mut expected = BTreeSet::new();
        for (name, filler) in &parts {
            formula.push_str(filler);
            formula.push('{');
            formula.push_str(name);
            formula.push('}');
            expected.insert(name.clone());
        }

        prop_assert_eq!(dependencies(&formula), expected);
    }

    /// Text with no braces passes through resolution untouched.
    #[test]
    fn brace_free_text_resolves_to_itself(text in "[^{}]{0,64}") {
        let pool = VariablePool::new();
        let config = ProductConfig::new();
        let fields = HashMap::new();
        let combos = HashMap::new();
        let reserved = ReservedValues::default();
        let ctx = ResolveContext::new(&pool, &config, &fields, &combos, &reserved);

        prop_assert_eq!(resolve(&text, &ctx), text);
    }

    /// Resolution is a no-op on its own output when the pool values contain
    /// no further placeholders.
    #[test]
    fn resolution_is_idempotent(
        name in "[a-z_][a-z0-9_]{0,8}",
        value in "[^{}]{0,16}",
    ) {
        let mut pool = VariablePool::new();
        pool.set(&name, serde_json::Value::String(value), apiforge::Provenance::UserField);
        let config = ProductConfig::new();
        let fields = HashMap::new();
        let combos = HashMap::new();
        let reserved = ReservedValues::default();
        let ctx = ResolveContext::new(&pool, &config, &fields, &combos, &reserved);

        let input = format!("x={{{}}}", name);
        let once = resolve(&input, &ctx);
        prop_assert_eq!(resolve(&once, &ctx), once.clone());
    }
}
