//! Tracemode: per-class, per-mode instrumentation pipelines with inheritance.
//!
//! # Overview
//!
//! A hierarchy of [`TraceClass`]es declares instrumentation layers. Each
//! declaration is either visible in every mode or scoped to a set of named
//! modes. At execution time the engine resolves the layers that apply to a
//! (class, mode) pair, folds them over a base type into an immutable
//! [`TracePipeline`], caches it on the class, and hands each execution a
//! fresh [`TraceInstance`] built from validated construction parameters.
//!
//! # Core Guarantees
//!
//! - **Root-first resolution**: ancestors' layers run inside descendants'; at
//!   each level `All`-scoped layers precede mode-scoped ones
//! - **Exact mode membership**: a layer scoped to mode `N` never leaks into
//!   mode `M`; unknown modes get the `All`-scoped baseline, not an error
//! - **Compute once per (class, mode)**: pipelines are cached per class and
//!   only rebuilt after an explicit [`TraceClass::reset_cache`]
//! - **Fresh instances**: every execution gets its own decorator chain
//!
//! # Module Structure
//!
//! - [`mode`]: Mode names and layer scopes
//! - [`trace`](mod@trace): The [`Trace`] operation interface and trace points
//! - [`layer`]: Registered capabilities ([`TraceLayer`])
//! - [`base`]: Base types ([`BaseTrace`])
//! - [`class`]: Class nodes and their registration stores
//! - [`resolve`]: Ancestry-aware mode resolution
//! - [`options`]: Declared options and caller-supplied parameters
//! - [`pipeline`]: Pipeline composition and caching
//! - [`factory`]: Validated instance construction
//! - [`legacy`]: Shim for single-pipeline tracers
//! - [`config`]: Engine configuration
//! - [`error`](mod@error): Error types
//!
//! # Example
//!
//! ```
//! use tracemode::{LayerOptions, ModeName, TraceClass, TraceParams, layer_fn};
//!
//! let parent = TraceClass::root("P");
//! parent.declare_layer(layer_fn("G", |i, _| Ok(i)), None, LayerOptions::new()).unwrap();
//! parent.declare_layer(layer_fn("S", |i, _| Ok(i)), "special", LayerOptions::new()).unwrap();
//!
//! let child = TraceClass::subclass(&parent, "C");
//! child
//!     .declare_layer(
//!         layer_fn("CS", |i, _| Ok(i)),
//!         ["special", "extra_special"],
//!         LayerOptions::new(),
//!     )
//!     .unwrap();
//!
//! assert_eq!(child.pipeline_for("special").layer_names(), vec!["G", "S", "CS"]);
//! assert_eq!(child.pipeline_for("extra_special").layer_names(), vec!["G", "CS"]);
//!
//! let instance = child
//!     .new_instance(Some(ModeName::from("special")), TraceParams::new())
//!     .unwrap();
//! assert_eq!(instance.pipeline().ancestry(), vec!["CS", "S", "G", "null"]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_possible_truncation)]

pub mod base;
pub mod class;
pub mod config;
pub mod error;
pub mod factory;
pub mod layer;
pub mod legacy;
pub mod mode;
pub mod options;
pub mod pipeline;
pub mod resolve;
pub mod trace;
pub(crate) mod tracing_compat;

// ── Test-only modules ───────────────────────────────────────────────────
#[cfg(any(test, feature = "test-internals"))]
pub mod test_utils;

// Re-exports for convenient access to core types
pub use base::{BaseTrace, FnBase, NullBase};
pub use class::{LayerDeclaration, TraceClass};
pub use config::{BuildPolicy, ConfigError, EngineConfig};
pub use error::{Result, TraceModeError};
pub use factory::{TraceInstance, TraceRequest, merge_params};
pub use layer::{FnLayer, Identity, TraceLayer, layer_fn};
pub use legacy::{LegacyShim, LegacyTracer};
pub use mode::{ModeName, ModeScope};
pub use options::{AggregatedOption, LayerOptions, OptionSet, OptionSpec, TraceParams, aggregate_options};
pub use pipeline::{CacheStats, TracePipeline};
pub use trace::{NullTrace, Trace, TraceEvent, TracePoint};
