//! Base types: the innermost object every pipeline wraps.

use crate::error::Result;
use crate::options::TraceParams;
use crate::trace::{NullTrace, Trace};
use std::fmt;
use std::sync::{Arc, LazyLock};

/// Constructs the innermost [`Trace`] of a pipeline.
pub trait BaseTrace: Send + Sync {
    /// Name used for introspection.
    fn name(&self) -> &str;

    /// Builds a fresh base trace for one execution.
    fn instantiate(&self, params: &TraceParams) -> Result<Box<dyn Trace>>;
}

impl fmt::Debug for dyn BaseTrace + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BaseTrace").field(&self.name()).finish()
    }
}

static NULL_BASE: LazyLock<Arc<dyn BaseTrace>> = LazyLock::new(|| Arc::new(NullBase));

/// The built-in no-op base type.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullBase;

impl NullBase {
    /// Shared handle to the no-op base. Every call returns the same `Arc`.
    #[must_use]
    pub fn shared() -> Arc<dyn BaseTrace> {
        Arc::clone(&NULL_BASE)
    }
}

impl BaseTrace for NullBase {
    fn name(&self) -> &str {
        NullTrace::NAME
    }

    fn instantiate(&self, _params: &TraceParams) -> Result<Box<dyn Trace>> {
        Ok(Box::new(NullTrace))
    }
}

/// A base type backed by a constructor closure.
pub struct FnBase<F> {
    name: String,
    f: F,
}

impl<F> FnBase<F>
where
    F: Fn(&TraceParams) -> Result<Box<dyn Trace>> + Send + Sync + 'static,
{
    /// Creates a closure base.
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Wraps the base in an `Arc`, ready to install on a class.
    pub fn shared(self) -> Arc<dyn BaseTrace> {
        Arc::new(self)
    }
}

impl<F> fmt::Debug for FnBase<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnBase").field("name", &self.name).finish()
    }
}

impl<F> BaseTrace for FnBase<F>
where
    F: Fn(&TraceParams) -> Result<Box<dyn Trace>> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn instantiate(&self, params: &TraceParams) -> Result<Box<dyn Trace>> {
        (self.f)(params)
    }
}
