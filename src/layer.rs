//! Layering primitives for trace pipelines.

use crate::error::Result;
use crate::options::TraceParams;
use crate::trace::Trace;
use std::fmt;
use std::sync::Arc;

/// A registered capability: decorates an inner trace to produce a new one.
///
/// The returned trace becomes the new outer layer. It runs first when the
/// composed pipeline is invoked and must delegate to `inner`.
pub trait TraceLayer: Send + Sync {
    /// Name used for introspection and error reporting.
    fn name(&self) -> &str;

    /// Wraps an inner trace with this layer.
    fn layer(&self, inner: Box<dyn Trace>, params: &TraceParams) -> Result<Box<dyn Trace>>;
}

impl fmt::Debug for dyn TraceLayer + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TraceLayer").field(&self.name()).finish()
    }
}

/// Identity layer that returns the inner trace unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl TraceLayer for Identity {
    fn name(&self) -> &str {
        "identity"
    }

    fn layer(&self, inner: Box<dyn Trace>, _params: &TraceParams) -> Result<Box<dyn Trace>> {
        Ok(inner)
    }
}

type LayerFn = dyn Fn(Box<dyn Trace>, &TraceParams) -> Result<Box<dyn Trace>> + Send + Sync;

/// A layer backed by a closure.
pub struct FnLayer {
    name: String,
    f: Box<LayerFn>,
}

impl FnLayer {
    /// Creates a closure layer.
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Box<dyn Trace>, &TraceParams) -> Result<Box<dyn Trace>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            f: Box::new(f),
        }
    }
}

impl fmt::Debug for FnLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnLayer").field("name", &self.name).finish()
    }
}

impl TraceLayer for FnLayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn layer(&self, inner: Box<dyn Trace>, params: &TraceParams) -> Result<Box<dyn Trace>> {
        (self.f)(inner, params)
    }
}

/// Shorthand for an `Arc`-wrapped [`FnLayer`], ready to declare.
pub fn layer_fn<F>(name: impl Into<String>, f: F) -> Arc<dyn TraceLayer>
where
    F: Fn(Box<dyn Trace>, &TraceParams) -> Result<Box<dyn Trace>> + Send + Sync + 'static,
{
    Arc::new(FnLayer::new(name, f))
}
