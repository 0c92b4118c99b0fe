//! Test helpers: layers and bases that record what they see.
//!
//! Available in unit tests and behind the `test-internals` feature.

use crate::base::BaseTrace;
use crate::error::Result;
use crate::layer::TraceLayer;
use crate::options::TraceParams;
use crate::trace::{Trace, TracePoint};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

/// Shared, ordered log of recorded entries.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    /// Copy of the entries so far.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    /// Removes and returns every entry.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.entries.lock())
    }
}

/// A layer that logs `name` when entered, then delegates.
///
/// If `param` is set, the layer also logs `name=<value>` for that
/// construction parameter when it is built.
#[derive(Debug, Clone)]
pub struct RecordingLayer {
    name: String,
    log: EventLog,
    param: Option<String>,
}

impl RecordingLayer {
    /// Creates a recording layer ready to declare.
    pub fn shared(name: impl Into<String>, log: &EventLog) -> Arc<dyn TraceLayer> {
        Arc::new(Self {
            name: name.into(),
            log: log.clone(),
            param: None,
        })
    }

    /// Creates a recording layer that also records one construction parameter.
    pub fn with_param(
        name: impl Into<String>,
        param: impl Into<String>,
        log: &EventLog,
    ) -> Arc<dyn TraceLayer> {
        Arc::new(Self {
            name: name.into(),
            log: log.clone(),
            param: Some(param.into()),
        })
    }
}

impl TraceLayer for RecordingLayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn layer(&self, inner: Box<dyn Trace>, params: &TraceParams) -> Result<Box<dyn Trace>> {
        if let Some(param) = &self.param {
            let value = params.get(param).cloned().unwrap_or(Value::Null);
            self.log.push(format!("{}={value}", self.name));
        }
        Ok(Box::new(RecordingTrace {
            name: self.name.clone(),
            log: self.log.clone(),
            inner: Some(inner),
        }))
    }
}

/// A base that logs `base:<name>` before running the work.
#[derive(Debug, Clone)]
pub struct RecordingBase {
    name: String,
    log: EventLog,
}

impl RecordingBase {
    /// Creates a recording base ready to install.
    pub fn shared(name: impl Into<String>, log: &EventLog) -> Arc<dyn BaseTrace> {
        Arc::new(Self {
            name: name.into(),
            log: log.clone(),
        })
    }
}

impl BaseTrace for RecordingBase {
    fn name(&self) -> &str {
        &self.name
    }

    fn instantiate(&self, _params: &TraceParams) -> Result<Box<dyn Trace>> {
        Ok(Box::new(RecordingTrace {
            name: format!("base:{}", self.name),
            log: self.log.clone(),
            inner: None,
        }))
    }
}

struct RecordingTrace {
    name: String,
    log: EventLog,
    inner: Option<Box<dyn Trace>>,
}

impl Trace for RecordingTrace {
    fn trace(&mut self, point: &TracePoint, work: &mut dyn FnMut() -> Value) -> Value {
        self.log.push(self.name.clone());
        match &mut self.inner {
            Some(inner) => inner.trace(point, work),
            None => work(),
        }
    }

    fn name(&self) -> &str {
        self.name.strip_prefix("base:").unwrap_or(&self.name)
    }

    fn inner(&self) -> Option<&dyn Trace> {
        self.inner.as_deref()
    }
}

/// Installs a test subscriber once; `RUST_LOG` overrides the
/// `tracemode=debug` default.
#[cfg(feature = "test-internals")]
pub fn init_test_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tracemode=debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
