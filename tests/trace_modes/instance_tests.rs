use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracemode::test_utils::{EventLog, RecordingLayer};
use tracemode::{
    BuildPolicy, EngineConfig, LayerOptions, ModeName, ModeScope, TraceClass, TraceModeError,
    TraceParams, TraceRequest, layer_fn,
};

fn parameterized(log: &EventLog) -> Arc<TraceClass> {
    let class = TraceClass::root("M");
    class
        .declare_layer(
            RecordingLayer::with_param("T1", "arg1", log),
            ModeScope::All,
            LayerOptions::new().required("arg1"),
        )
        .unwrap();
    class
        .declare_layer(
            RecordingLayer::with_param("T2", "arg2", log),
            "extra",
            LayerOptions::new().required("arg2"),
        )
        .unwrap();
    class
        .declare_layer(
            RecordingLayer::with_param("T3", "arg3", log),
            ModeScope::All,
            LayerOptions::new().with_default("arg3", 3),
        )
        .unwrap();
    class
}

#[test]
fn layers_receive_merged_params_in_build_order() {
    crate::common::init_test_logging();
    let log = EventLog::new();
    let class = parameterized(&log);

    let instance = class
        .trace_for(TraceRequest::new().mode("extra").param("arg1", 1).param("arg2", 2))
        .unwrap();

    assert_eq!(log.take(), vec!["T1=1", "T3=3", "T2=2"]);
    assert_eq!(instance.params().len(), 3);
}

#[test]
fn missing_parameter_only_for_included_layers() {
    crate::common::init_test_logging();
    let log = EventLog::new();
    let class = parameterized(&log);

    // arg2 belongs to a layer excluded from the default mode.
    assert!(
        class
            .new_instance(None, TraceParams::new().with("arg1", 1))
            .is_ok()
    );

    let err = class
        .new_instance(Some("extra".into()), TraceParams::new().with("arg1", 1))
        .unwrap_err();
    assert_eq!(
        err,
        TraceModeError::MissingParameter {
            parameter: "arg2".into(),
            capability: "T2".into(),
            mode: ModeName::from("extra"),
        }
    );
}

#[test]
fn defaults_satisfy_requirements() {
    crate::common::init_test_logging();
    let log = EventLog::new();
    let class = parameterized(&log);

    let instance = class
        .new_instance(None, TraceParams::new().with("arg1", "x"))
        .unwrap();
    assert_eq!(instance.params().get_as::<u32>("arg3").unwrap(), Some(3));

    let overridden = class
        .new_instance(None, TraceParams::new().with("arg1", "x").with("arg3", 30))
        .unwrap();
    assert_eq!(overridden.params().get_as::<u32>("arg3").unwrap(), Some(30));
}

#[test]
fn failed_instantiation_keeps_cache_intact() {
    crate::common::init_test_logging();
    let log = EventLog::new();
    let class = parameterized(&log);

    let before = class.pipeline_for(ModeName::DEFAULT);
    assert!(class.new_instance(None, TraceParams::new()).is_err());
    let after = class.pipeline_for(ModeName::DEFAULT);

    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(class.cache_stats().builds.load(Ordering::Relaxed), 1);
}

#[test]
fn construction_errors_surface_to_caller() {
    crate::common::init_test_logging();
    let class = TraceClass::root("Schema");
    class
        .declare_layer(
            layer_fn("needs_token", |inner, params| {
                if params.contains("token") {
                    Ok(inner)
                } else {
                    Err(TraceModeError::construction("needs_token", "no token"))
                }
            }),
            ModeScope::All,
            LayerOptions::new(),
        )
        .unwrap();

    // Undeclared parameters still reach the layers.
    let instance = class
        .new_instance(None, TraceParams::new().with("token", "t"))
        .unwrap();
    assert_eq!(instance.chain(), vec!["null"]);

    let err = class.new_instance(None, TraceParams::new()).unwrap_err();
    assert_eq!(err, TraceModeError::construction("needs_token", "no token"));
    assert_eq!(class.cached_modes(), vec![ModeName::DEFAULT]);
}

#[test]
fn serialized_hierarchy_shares_policy() {
    crate::common::init_test_logging();
    let root = TraceClass::root_with_config(
        "Schema",
        EngineConfig::new()
            .build_policy(BuildPolicy::Serialized)
            .warn_on_unknown_mode(false),
    );
    let child = TraceClass::subclass(&root, "Child");
    let log = EventLog::new();
    root.declare_layer(
        RecordingLayer::shared("G", &log),
        ModeScope::All,
        LayerOptions::new(),
    )
    .unwrap();

    let pipelines: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..16)
            .map(|_| s.spawn(|| child.pipeline_for("special")))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(child.engine_config().build_policy, BuildPolicy::Serialized);
    assert_eq!(child.cache_stats().builds.load(Ordering::Relaxed), 1);
    assert!(pipelines.iter().all(|p| Arc::ptr_eq(p, &pipelines[0])));
    assert!(root.cached_modes().is_empty());
}

#[test]
fn concurrent_instances_are_independent() {
    crate::common::init_test_logging();
    let log = EventLog::new();
    let class = parameterized(&log);

    let chains: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let class = &class;
                s.spawn(move || {
                    let instance = class
                        .new_instance(None, TraceParams::new().with("arg1", i))
                        .unwrap();
                    (instance.params().get_as::<i32>("arg1").unwrap(), instance.chain().len())
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let mut seen: Vec<_> = chains.iter().map(|(arg, _)| arg.unwrap_or(-1)).collect();
    seen.sort_unstable();
    assert_eq!(seen, vec![0, 1, 2, 3]);
    assert!(chains.iter().all(|(_, depth)| *depth == 3));
}

#[test]
fn child_option_overrides_parent_option_of_same_name() {
    crate::common::init_test_logging();
    let log = EventLog::new();
    let parent = TraceClass::root("P");
    parent
        .declare_layer(
            RecordingLayer::shared("ParentLimit", &log),
            ModeScope::All,
            LayerOptions::new().with_default("limit", 10),
        )
        .unwrap();
    let strict = TraceClass::subclass(&parent, "Strict");
    strict
        .declare_layer(
            RecordingLayer::shared("ChildLimit", &log),
            ModeScope::All,
            LayerOptions::new().required("limit"),
        )
        .unwrap();
    let relaxed = TraceClass::subclass(&parent, "Relaxed");
    relaxed
        .declare_layer(
            RecordingLayer::shared("ChildDefault", &log),
            "special",
            LayerOptions::new().with_default("limit", 99),
        )
        .unwrap();

    let options = strict.options_for(ModeName::DEFAULT);
    let limit = options.get("limit").unwrap();
    assert_eq!(limit.capability(), "ChildLimit");
    assert!(limit.spec().is_required());

    let err = strict.new_instance(None, TraceParams::new()).unwrap_err();
    assert_eq!(
        err,
        TraceModeError::MissingParameter {
            parameter: "limit".into(),
            capability: "ChildLimit".into(),
            mode: ModeName::DEFAULT,
        }
    );

    let from_parent = parent.new_instance(None, TraceParams::new()).unwrap();
    assert_eq!(from_parent.params().get_as::<u32>("limit").unwrap(), Some(10));

    let special = relaxed
        .new_instance(Some("special".into()), TraceParams::new())
        .unwrap();
    assert_eq!(special.params().get_as::<u32>("limit").unwrap(), Some(99));
    assert_eq!(
        relaxed.options_for("special").get("limit").unwrap().capability(),
        "ChildDefault"
    );
    let baseline = relaxed.new_instance(None, TraceParams::new()).unwrap();
    assert_eq!(baseline.params().get_as::<u32>("limit").unwrap(), Some(10));
}
