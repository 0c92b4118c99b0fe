//! Pipeline composition and per-class memoization.
//!
//! A [`TracePipeline`] is the immutable composed type for one (class, mode)
//! pair: a base type, an optional legacy shim directly over it, and the
//! resolved layers folded outward in order. Given layers `[L1, L2, L3]`, an
//! instance runs `L3` first, which delegates to `L2`, then `L1`, then the
//! shim, then the base.
//!
//! # Caching
//!
//! Each class owns its own cache. The read path only takes a read lock. On a
//! miss the fold runs outside any lock (or under the class build lock with
//! [`BuildPolicy::Serialized`]) and the result is published with
//! first-writer-wins, so every caller after publication sees the same `Arc`.
//! Entries stay until [`TraceClass::reset_cache`] drops them.

use crate::base::BaseTrace;
use crate::class::{LayerDeclaration, TraceClass};
use crate::config::BuildPolicy;
use crate::error::Result;
use crate::layer::TraceLayer;
use crate::legacy::LegacyShim;
use crate::mode::ModeName;
use crate::options::{OptionSet, TraceParams, aggregate_options};
use crate::trace::Trace;
use crate::tracing_compat::{debug, info, trace, warn};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// The immutable composed pipeline for one (class, mode) pair.
pub struct TracePipeline {
    class: String,
    mode: ModeName,
    base: Arc<dyn BaseTrace>,
    legacy: Option<LegacyShim>,
    layers: Vec<Arc<LayerDeclaration>>,
    options: OptionSet,
}

impl TracePipeline {
    /// Name of the class this pipeline was built for.
    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.class
    }

    /// The mode this pipeline was built for.
    #[must_use]
    pub fn mode(&self) -> &ModeName {
        &self.mode
    }

    /// The base type at the bottom of the chain.
    #[must_use]
    pub fn base(&self) -> &Arc<dyn BaseTrace> {
        &self.base
    }

    /// Returns `true` if the legacy shim sits over the base.
    #[must_use]
    pub fn has_legacy_shim(&self) -> bool {
        self.legacy.is_some()
    }

    /// Resolved declarations, innermost first.
    #[must_use]
    pub fn layers(&self) -> &[Arc<LayerDeclaration>] {
        &self.layers
    }

    /// Capability names in resolved order, innermost first.
    #[must_use]
    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.iter().map(|d| d.capability_name()).collect()
    }

    /// Every name in the composed chain, outermost first, ending at the base.
    #[must_use]
    pub fn ancestry(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.layers.iter().rev().map(|d| d.capability_name()).collect();
        if self.legacy.is_some() {
            names.push(LegacyShim::NAME);
        }
        names.push(self.base.name());
        names
    }

    /// Returns `true` if `name` appears anywhere in the chain.
    #[must_use]
    pub fn includes(&self, name: &str) -> bool {
        self.ancestry().contains(&name)
    }

    /// Merged construction parameters for this pipeline.
    #[must_use]
    pub fn options(&self) -> &OptionSet {
        &self.options
    }

    /// Returns `true` if `other` composes the same base, shim, layers and
    /// options for the same mode.
    #[must_use]
    pub fn is_equivalent(&self, other: &Self) -> bool {
        self.mode == other.mode
            && Arc::ptr_eq(&self.base, &other.base)
            && self.legacy.as_ref().map(LegacyShim::tracer_count)
                == other.legacy.as_ref().map(LegacyShim::tracer_count)
            && self.layers.len() == other.layers.len()
            && self
                .layers
                .iter()
                .zip(&other.layers)
                .all(|(a, b)| Arc::ptr_eq(a, b))
            && self.options == other.options
    }

    /// Builds the decorator chain for one execution.
    pub(crate) fn instantiate(&self, params: &TraceParams) -> Result<Box<dyn Trace>> {
        let mut trace = self.base.instantiate(params)?;
        if let Some(shim) = &self.legacy {
            trace = shim.layer(trace, params)?;
        }
        for decl in &self.layers {
            trace = decl.capability().layer(trace, params)?;
        }
        Ok(trace)
    }
}

impl fmt::Debug for TracePipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TracePipeline")
            .field("class", &self.class)
            .field("mode", &self.mode)
            .field("ancestry", &self.ancestry())
            .field("options", &self.options.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Cache counters for one class.
#[derive(Debug, Default)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: AtomicU64,
    /// Pipelines folded (including duplicates discarded on publish).
    pub builds: AtomicU64,
    /// Entries dropped by resets.
    pub resets: AtomicU64,
}

/// Lazily populated `mode -> pipeline` map owned by one class.
#[derive(Default)]
pub(crate) struct PipelineCache {
    entries: RwLock<HashMap<ModeName, Arc<TracePipeline>>>,
    build_lock: Mutex<()>,
    stats: CacheStats,
}

impl PipelineCache {
    fn get(&self, mode: &ModeName) -> Option<Arc<TracePipeline>> {
        let hit = self.entries.read().get(mode).cloned();
        if hit.is_some() {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
        }
        hit
    }

    fn publish(&self, mode: ModeName, built: TracePipeline) -> Arc<TracePipeline> {
        let mut entries = self.entries.write();
        Arc::clone(entries.entry(mode).or_insert_with(|| Arc::new(built)))
    }
}

impl TraceClass {
    /// The composed pipeline for `mode`, built on first request.
    ///
    /// Two calls return the same `Arc` until [`reset_cache`](Self::reset_cache).
    pub fn pipeline_for(&self, mode: impl Into<ModeName>) -> Arc<TracePipeline> {
        let mode = mode.into();
        let cache = self.cache();
        if let Some(hit) = cache.get(&mode) {
            trace!(class = %self.name(), mode = %mode, "trace pipeline cache hit");
            return hit;
        }

        match self.engine_config().build_policy {
            BuildPolicy::Optimistic => cache.publish(mode.clone(), self.build_pipeline(&mode)),
            BuildPolicy::Serialized => {
                let _guard = cache.build_lock.lock();
                if let Some(hit) = cache.get(&mode) {
                    return hit;
                }
                cache.publish(mode.clone(), self.build_pipeline(&mode))
            }
        }
    }

    /// Merged construction parameters for `mode`.
    ///
    /// Read from the cached pipeline, so the option set always matches the
    /// layers [`pipeline_for`](Self::pipeline_for) returns.
    pub fn options_for(&self, mode: impl Into<ModeName>) -> OptionSet {
        self.pipeline_for(mode).options().clone()
    }

    /// Drops one cached pipeline, or every pipeline with `None`.
    ///
    /// Only this class's cache is touched. Returns the number of entries
    /// removed.
    ///
    /// Under [`BuildPolicy::Optimistic`] a build that started before the
    /// reset may still publish afterwards, built from the registrations it
    /// read at the time. Reset only once concurrent lookups for the affected
    /// modes have quiesced.
    pub fn reset_cache(&self, mode: Option<&ModeName>) -> usize {
        let cache = self.cache();
        let removed = {
            let mut entries = cache.entries.write();
            match mode {
                Some(mode) => usize::from(entries.remove(mode).is_some()),
                None => {
                    let count = entries.len();
                    entries.clear();
                    count
                }
            }
        };
        cache
            .stats
            .resets
            .fetch_add(removed as u64, Ordering::Relaxed);
        info!(
            class = %self.name(),
            mode = ?mode.map(ModeName::as_str),
            removed,
            "trace pipeline cache reset"
        );
        removed
    }

    /// Modes with a cached pipeline on this class.
    #[must_use]
    pub fn cached_modes(&self) -> Vec<ModeName> {
        let mut modes: Vec<_> = self.cache().entries.read().keys().cloned().collect();
        modes.sort();
        modes
    }

    /// Cache counters for this class.
    #[must_use]
    pub fn cache_stats(&self) -> &CacheStats {
        &self.cache().stats
    }

    /// Folds the current registrations into a pipeline. Pure: reads
    /// registrations and allocates, nothing else.
    fn build_pipeline(&self, mode: &ModeName) -> TracePipeline {
        if self.engine_config().warn_on_unknown_mode && !self.is_known_mode(mode) {
            warn!(
                class = %self.name(),
                mode = %mode,
                "building trace pipeline for an undeclared mode; only baseline layers apply"
            );
        }

        let base = self.effective_base(mode);
        let legacy = self.legacy_tracers().map(LegacyShim::new);
        let layers = self.resolve(mode);
        let options = aggregate_options(&layers);

        self.cache().stats.builds.fetch_add(1, Ordering::Relaxed);
        debug!(
            class = %self.name(),
            mode = %mode,
            base = base.name(),
            legacy_shim = legacy.is_some(),
            layers = layers.len(),
            options = options.len(),
            "built trace pipeline"
        );

        TracePipeline {
            class: self.name().to_string(),
            mode: mode.clone(),
            base,
            legacy,
            layers,
            options,
        }
    }
}
