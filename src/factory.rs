//! Instance factory: validated, per-execution trace objects.
//!
//! Every call produces a fresh [`TraceInstance`]; only the underlying
//! [`TracePipeline`] is shared. Instances carry no shared mutable state, so
//! concurrent executions never observe each other's layers.

use crate::class::TraceClass;
use crate::error::{Result, TraceModeError};
use crate::mode::ModeName;
use crate::options::{OptionSet, TraceParams};
use crate::pipeline::TracePipeline;
use crate::trace::{Trace, TracePoint};
use crate::tracing_compat::debug;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A request for a trace instance, as carried by one execution.
#[derive(Debug, Clone, Default)]
pub struct TraceRequest {
    mode: Option<ModeName>,
    params: TraceParams,
}

impl TraceRequest {
    /// A request with no mode hint and no parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the mode hint.
    #[must_use]
    pub fn mode(mut self, mode: impl Into<ModeName>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    /// Adds one parameter value.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name, value);
        self
    }

    /// Replaces the parameter values.
    #[must_use]
    pub fn params(mut self, params: TraceParams) -> Self {
        self.params = params;
        self
    }

    /// The mode hint, if any.
    #[must_use]
    pub fn mode_hint(&self) -> Option<&ModeName> {
        self.mode.as_ref()
    }
}

/// A constructed pipeline for one execution.
pub struct TraceInstance {
    pipeline: Arc<TracePipeline>,
    params: TraceParams,
    trace: Box<dyn Trace>,
}

impl TraceInstance {
    /// The mode this instance was built for.
    #[must_use]
    pub fn mode(&self) -> &ModeName {
        self.pipeline.mode()
    }

    /// The shared pipeline this instance was built from.
    #[must_use]
    pub fn pipeline(&self) -> &Arc<TracePipeline> {
        &self.pipeline
    }

    /// Effective parameters: declared defaults overridden by supplied values.
    #[must_use]
    pub fn params(&self) -> &TraceParams {
        &self.params
    }

    /// Layer names of the live chain, outermost first.
    ///
    /// Layers whose constructor returned `inner` unchanged leave no object in
    /// the chain and are not listed; [`TracePipeline::ancestry`] lists every
    /// resolved layer.
    #[must_use]
    pub fn chain(&self) -> Vec<&str> {
        self.trace.chain()
    }

    /// Unwraps the outermost trace object.
    #[must_use]
    pub fn into_trace(self) -> Box<dyn Trace> {
        self.trace
    }
}

impl Trace for TraceInstance {
    fn trace(&mut self, point: &TracePoint, work: &mut dyn FnMut() -> Value) -> Value {
        self.trace.trace(point, work)
    }

    fn name(&self) -> &str {
        self.trace.name()
    }

    fn inner(&self) -> Option<&dyn Trace> {
        self.trace.inner()
    }
}

impl fmt::Debug for TraceInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceInstance")
            .field("class", &self.pipeline.class_name())
            .field("mode", self.pipeline.mode())
            .field("chain", &self.chain())
            .finish()
    }
}

/// Merges declared defaults with supplied values and checks that every
/// required parameter is present.
///
/// Supplied values no layer declared pass through unchanged. Missing
/// parameters are reported in name order.
pub fn merge_params(options: &OptionSet, supplied: TraceParams, mode: &ModeName) -> Result<TraceParams> {
    let mut merged = TraceParams::new();
    for (name, option) in options.iter() {
        if supplied.contains(name) {
            continue;
        }
        match option.spec().default_value() {
            Some(default) => {
                merged.insert(name, default.clone());
            }
            None => {
                return Err(TraceModeError::MissingParameter {
                    parameter: name.to_string(),
                    capability: option.capability().to_string(),
                    mode: mode.clone(),
                });
            }
        }
    }
    for (name, value) in supplied {
        merged.insert(name, value);
    }
    Ok(merged)
}

impl TraceClass {
    /// Builds a fresh trace instance for `mode` (or the class default).
    ///
    /// # Errors
    ///
    /// [`TraceModeError::MissingParameter`] when a required parameter of an
    /// included layer is neither supplied nor defaulted; construction errors
    /// from layers or the base type are passed through. Errors never affect
    /// the pipeline cache.
    pub fn new_instance(&self, mode: Option<ModeName>, params: TraceParams) -> Result<TraceInstance> {
        let mode = mode.unwrap_or_else(|| self.default_mode());
        let pipeline = self.pipeline_for(&mode);
        let params = merge_params(pipeline.options(), params, &mode).inspect_err(|err| {
            debug!(class = %self.name(), mode = %mode, error = %err, "trace instantiation rejected");
        })?;
        let trace = pipeline.instantiate(&params)?;
        Ok(TraceInstance {
            pipeline,
            params,
            trace,
        })
    }

    /// Builds an instance from an execution's request.
    ///
    /// A request without a mode hint selects [`default_mode`](Self::default_mode).
    pub fn trace_for(&self, request: TraceRequest) -> Result<TraceInstance> {
        self.new_instance(request.mode, request.params)
    }
}
