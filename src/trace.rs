//! The operation interface every pipeline layer implements.
//!
//! A composed pipeline is a chain of [`Trace`] objects. Each layer holds the
//! next inner layer and is responsible for delegating to it; the innermost
//! object (built by a [`BaseTrace`](crate::base::BaseTrace)) finally runs the
//! instrumented work.
//!
//! ```text
//! caller ──► L3 ──► L2 ──► L1 ──► base ──► work()
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Execution hooks emitted by the query engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceEvent {
    /// Tokenizing a query string.
    Lex,
    /// Parsing a query document.
    Parse,
    /// Validating a document against the schema.
    Validate,
    /// Running analyzers over a multiplex.
    AnalyzeMultiplex,
    /// Running analyzers over one query.
    AnalyzeQuery,
    /// Executing a multiplex.
    ExecuteMultiplex,
    /// Executing one query.
    ExecuteQuery,
    /// Resolving deferred values of one query.
    ExecuteQueryLazy,
    /// Resolving one field.
    ExecuteField,
    /// Resolving a deferred field value.
    ExecuteFieldLazy,
    /// Authorization check on an object.
    Authorized,
    /// Deferred authorization check.
    AuthorizedLazy,
    /// Resolving an abstract type.
    ResolveType,
    /// Deferred abstract type resolution.
    ResolveTypeLazy,
}

impl TraceEvent {
    /// Every event, in execution order.
    pub const ALL: [Self; 14] = [
        Self::Lex,
        Self::Parse,
        Self::Validate,
        Self::AnalyzeMultiplex,
        Self::AnalyzeQuery,
        Self::ExecuteMultiplex,
        Self::ExecuteQuery,
        Self::ExecuteQueryLazy,
        Self::ExecuteField,
        Self::ExecuteFieldLazy,
        Self::Authorized,
        Self::AuthorizedLazy,
        Self::ResolveType,
        Self::ResolveTypeLazy,
    ];

    /// Key used by legacy single-pipeline tracers for this event.
    #[must_use]
    pub const fn legacy_key(self) -> &'static str {
        match self {
            Self::Lex => "lex",
            Self::Parse => "parse",
            Self::Validate => "validate",
            Self::AnalyzeMultiplex => "analyze_multiplex",
            Self::AnalyzeQuery => "analyze_query",
            Self::ExecuteMultiplex => "execute_multiplex",
            Self::ExecuteQuery => "execute_query",
            Self::ExecuteQueryLazy => "execute_query_lazy",
            Self::ExecuteField => "execute_field",
            Self::ExecuteFieldLazy => "execute_field_lazy",
            Self::Authorized => "authorized",
            Self::AuthorizedLazy => "authorized_lazy",
            Self::ResolveType => "resolve_type",
            Self::ResolveTypeLazy => "resolve_type_lazy",
        }
    }

    /// Returns `true` for events that resolve deferred values.
    #[must_use]
    pub const fn is_lazy(self) -> bool {
        matches!(
            self,
            Self::ExecuteQueryLazy
                | Self::ExecuteFieldLazy
                | Self::AuthorizedLazy
                | Self::ResolveTypeLazy
        )
    }
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.legacy_key())
    }
}

/// One instrumented operation as seen by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TracePoint {
    event: TraceEvent,
    label: String,
    fields: BTreeMap<String, Value>,
}

impl TracePoint {
    /// Creates a trace point for `event`.
    #[must_use]
    pub fn new(event: TraceEvent, label: impl Into<String>) -> Self {
        Self {
            event,
            label: label.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Adds a structured field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Returns the event kind.
    #[must_use]
    pub const fn event(&self) -> TraceEvent {
        self.event
    }

    /// Returns the label (field path, query name, ...).
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns a structured field.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Returns all structured fields.
    #[must_use]
    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }
}

/// A composable unit of instrumentation.
///
/// Implementations wrap one operation: they may act before and after, and
/// must delegate to their inner trace (or, for a base, run `work`) so the
/// chain continues.
pub trait Trace: Send {
    /// Wraps one instrumented operation and returns its result.
    fn trace(&mut self, point: &TracePoint, work: &mut dyn FnMut() -> Value) -> Value;

    /// Name of this layer, used for introspection.
    fn name(&self) -> &str;

    /// The next inner layer, if any.
    fn inner(&self) -> Option<&dyn Trace> {
        None
    }
}

impl dyn Trace + '_ {
    /// Layer names from this object inward to the base.
    #[must_use]
    pub fn chain(&self) -> Vec<&str> {
        let mut names = Vec::new();
        let mut current: Option<&dyn Trace> = Some(self);
        while let Some(layer) = current {
            names.push(layer.name());
            current = layer.inner();
        }
        names
    }

    /// Number of layers including the base.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.chain().len()
    }
}

impl fmt::Debug for dyn Trace + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trace").field("chain", &self.chain()).finish()
    }
}

/// Built-in no-op trace: runs the work and nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTrace;

impl NullTrace {
    /// Name reported by the no-op trace.
    pub const NAME: &'static str = "null";
}

impl Trace for NullTrace {
    fn trace(&mut self, _point: &TracePoint, work: &mut dyn FnMut() -> Value) -> Value {
        work()
    }

    fn name(&self) -> &str {
        Self::NAME
    }
}
