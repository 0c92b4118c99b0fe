use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracemode::{LayerOptions, ModeName, ModeScope, TraceClass, layer_fn};

const MODES: [&str; 4] = ["special", "extra", "debug", "profile"];

/// `None` is the all-modes scope.
type Scope = Option<Vec<&'static str>>;

fn arb_scope() -> impl Strategy<Value = Scope> {
    prop_oneof![
        Just(None),
        prop::sample::subsequence(MODES.to_vec(), 1..=MODES.len()).prop_map(Some),
    ]
}

fn arb_hierarchy() -> impl Strategy<Value = Vec<Vec<Scope>>> {
    prop::collection::vec(prop::collection::vec(arb_scope(), 0..5), 1..5)
}

fn layer_name(level: usize, index: usize) -> String {
    format!("L{level}_{index}")
}

/// Builds the hierarchy and returns the leaf class.
fn build(levels: &[Vec<Scope>]) -> Arc<TraceClass> {
    let mut class: Option<Arc<TraceClass>> = None;
    for (level, scopes) in levels.iter().enumerate() {
        let next = match &class {
            None => TraceClass::root(format!("C{level}")),
            Some(parent) => TraceClass::subclass(parent, format!("C{level}")),
        };
        for (index, scope) in scopes.iter().enumerate() {
            let scope = scope.clone().map_or(ModeScope::All, ModeScope::from);
            let name = layer_name(level, index);
            next.declare_layer(
                layer_fn(name.clone(), |inner, _| Ok(inner)),
                scope,
                LayerOptions::new().with_default(format!("opt_{name}"), index),
            )
            .unwrap();
        }
        class = Some(next);
    }
    class.unwrap()
}

/// Root to leaf; per level, all-scoped first, then the ones naming `mode`.
fn expected_layers(levels: &[Vec<Scope>], mode: &str) -> Vec<String> {
    let mut out = Vec::new();
    for (level, scopes) in levels.iter().enumerate() {
        for (index, scope) in scopes.iter().enumerate() {
            if scope.is_none() {
                out.push(layer_name(level, index));
            }
        }
        for (index, scope) in scopes.iter().enumerate() {
            if scope.as_ref().is_some_and(|modes| modes.iter().any(|m| *m == mode)) {
                out.push(layer_name(level, index));
            }
        }
    }
    out
}

proptest! {
    /// Resolution matches the root-first, all-before-scoped model for every mode.
    #[test]
    fn resolution_matches_model(levels in arb_hierarchy()) {
        let leaf = build(&levels);
        for mode in MODES.iter().copied().chain(["default", "unnamed"]) {
            let pipeline = leaf.pipeline_for(mode);
            let names: Vec<String> = pipeline.layer_names().into_iter().map(str::to_string).collect();
            prop_assert_eq!(names, expected_layers(&levels, mode));
        }
    }

    /// Option keys are exactly the union over the layers actually included.
    #[test]
    fn options_match_included_layers(levels in arb_hierarchy()) {
        let leaf = build(&levels);
        for mode in MODES {
            let keys: BTreeSet<String> = leaf.options_for(mode).keys().map(str::to_string).collect();
            let expected: BTreeSet<String> = expected_layers(&levels, mode)
                .into_iter()
                .map(|name| format!("opt_{name}"))
                .collect();
            prop_assert_eq!(keys, expected);
        }
    }

    /// Unknown modes see only the all-scoped baseline, and lookups are memoized.
    #[test]
    fn unknown_modes_get_baseline(levels in arb_hierarchy(), suffix in "[a-z]{1,8}") {
        let leaf = build(&levels);
        let mode = ModeName::from(format!("unknown_{suffix}"));

        let first = leaf.pipeline_for(&mode);
        let baseline = leaf.pipeline_for(ModeName::DEFAULT);
        prop_assert_eq!(first.layer_names(), baseline.layer_names());
        prop_assert!(Arc::ptr_eq(&first, &leaf.pipeline_for(&mode)));
        prop_assert!(!leaf.is_known_mode(&mode));
    }
}
