//! Compatibility shim for single-pipeline tracers.
//!
//! Older instrumentation was a flat list of tracer objects, each called with
//! a string key and expected to run a block. When a class (or an ancestor)
//! declares the shim, every pipeline it builds gets a [`LegacyShim`] layer
//! directly over the base type, which replays each trace point through those
//! tracers.

use crate::error::Result;
use crate::layer::TraceLayer;
use crate::options::TraceParams;
use crate::trace::{Trace, TracePoint};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// An old-style tracer.
pub trait LegacyTracer: Send + Sync {
    /// Wraps one operation identified by its legacy `key`.
    ///
    /// Implementations must call `work` exactly once and return its value,
    /// possibly after inspecting it.
    fn trace(&self, key: &str, point: &TracePoint, work: &mut dyn FnMut() -> Value) -> Value;
}

impl<F> LegacyTracer for F
where
    F: Fn(&str, &TracePoint, &mut dyn FnMut() -> Value) -> Value + Send + Sync,
{
    fn trace(&self, key: &str, point: &TracePoint, work: &mut dyn FnMut() -> Value) -> Value {
        self(key, point, work)
    }
}

/// The implicit first layer inserted for legacy tracers.
#[derive(Clone, Default)]
pub struct LegacyShim {
    tracers: Vec<Arc<dyn LegacyTracer>>,
}

impl LegacyShim {
    /// Name reported by the shim layer.
    pub const NAME: &'static str = "legacy_shim";

    /// Creates a shim over `tracers`; the first tracer runs outermost.
    #[must_use]
    pub fn new(tracers: Vec<Arc<dyn LegacyTracer>>) -> Self {
        Self { tracers }
    }

    /// Number of tracers replayed.
    #[must_use]
    pub fn tracer_count(&self) -> usize {
        self.tracers.len()
    }
}

impl fmt::Debug for LegacyShim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LegacyShim")
            .field("tracers", &self.tracers.len())
            .finish()
    }
}

impl TraceLayer for LegacyShim {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn layer(&self, inner: Box<dyn Trace>, _params: &TraceParams) -> Result<Box<dyn Trace>> {
        Ok(Box::new(LegacyShimTrace {
            tracers: self.tracers.clone(),
            inner,
        }))
    }
}

struct LegacyShimTrace {
    tracers: Vec<Arc<dyn LegacyTracer>>,
    inner: Box<dyn Trace>,
}

fn call_tracers(
    tracers: &[Arc<dyn LegacyTracer>],
    key: &str,
    point: &TracePoint,
    work: &mut dyn FnMut() -> Value,
) -> Value {
    match tracers.split_first() {
        None => work(),
        Some((first, rest)) => first.trace(key, point, &mut || call_tracers(rest, key, point, work)),
    }
}

impl Trace for LegacyShimTrace {
    fn trace(&mut self, point: &TracePoint, work: &mut dyn FnMut() -> Value) -> Value {
        let Self { tracers, inner } = self;
        if tracers.is_empty() {
            return inner.trace(point, work);
        }
        let key = point.event().legacy_key();
        call_tracers(tracers, key, point, &mut || inner.trace(point, work))
    }

    fn name(&self) -> &str {
        LegacyShim::NAME
    }

    fn inner(&self) -> Option<&dyn Trace> {
        Some(self.inner.as_ref())
    }
}
