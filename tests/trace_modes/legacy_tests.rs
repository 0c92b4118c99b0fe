use parking_lot::Mutex;
use serde_json::{Value, json};
use std::sync::Arc;
use tracemode::test_utils::{EventLog, RecordingBase, RecordingLayer};
use tracemode::{
    LayerOptions, LegacyShim, LegacyTracer, ModeScope, Trace, TraceClass, TraceEvent, TraceParams,
    TracePoint,
};

fn keyed(tag: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Arc<dyn LegacyTracer> {
    let log = Arc::clone(log);
    Arc::new(
        move |key: &str, point: &TracePoint, work: &mut dyn FnMut() -> Value| {
            log.lock().push(format!("{tag}:{key}:{}", point.label()));
            work()
        },
    )
}

#[test]
fn shim_sits_directly_over_base() {
    crate::common::init_test_logging();
    let events = EventLog::new();
    let root = TraceClass::root("Schema");
    root.set_base_type(RecordingBase::shared("engine", &events));
    root.declare_legacy_shim();
    root.declare_layer(
        RecordingLayer::shared("timing", &events),
        ModeScope::All,
        LayerOptions::new(),
    )
    .unwrap();

    let child = TraceClass::subclass(&root, "Child");
    let pipeline = child.pipeline_for("special");
    assert!(pipeline.has_legacy_shim());
    assert_eq!(pipeline.ancestry(), vec!["timing", LegacyShim::NAME, "engine"]);
}

#[test]
fn tracers_from_ancestry_run_root_first() {
    crate::common::init_test_logging();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let root = TraceClass::root("Schema");
    root.add_legacy_tracer(keyed("root", &calls));
    let child = TraceClass::subclass(&root, "Child");
    child.add_legacy_tracer(keyed("child", &calls));

    let mut instance = child.new_instance(None, TraceParams::new()).unwrap();
    let point = TracePoint::new(TraceEvent::ResolveTypeLazy, "Node");
    let out = instance.trace(&point, &mut || json!({"id": 1}));

    assert_eq!(out, json!({"id": 1}));
    assert_eq!(
        *calls.lock(),
        vec!["root:resolve_type_lazy:Node", "child:resolve_type_lazy:Node"]
    );
    assert_eq!(instance.chain(), vec![LegacyShim::NAME, "null"]);

    // The parent never sees the child's tracer.
    calls.lock().clear();
    let mut parent_instance = root.new_instance(None, TraceParams::new()).unwrap();
    parent_instance.trace(&point, &mut || Value::Null);
    assert_eq!(*calls.lock(), vec!["root:resolve_type_lazy:Node"]);
}

#[test]
fn classes_without_shim_have_none() {
    crate::common::init_test_logging();
    let root = TraceClass::root("Schema");
    let child = TraceClass::subclass(&root, "Child");
    child.declare_legacy_shim();

    assert!(!root.pipeline_for("default").has_legacy_shim());
    assert!(child.pipeline_for("default").has_legacy_shim());
}
