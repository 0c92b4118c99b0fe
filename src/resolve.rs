//! Ancestry-aware mode resolution.
//!
//! Resolution walks the ancestry root first. At each level it takes that
//! level's `All`-scoped declarations, then the declarations whose mode set
//! names the requested mode, both in declaration order. Levels are
//! concatenated root to leaf.
//!
//! Only exact mode-name membership counts: a child's declaration for mode
//! `M` never pulls in a parent's declaration for some other mode `N`. A mode
//! nobody declared resolves to the `All`-scoped baseline.

use crate::base::{BaseTrace, NullBase};
use crate::class::{LayerDeclaration, TraceClass};
use crate::legacy::LegacyTracer;
use crate::mode::ModeName;
use std::collections::BTreeSet;
use std::sync::Arc;

impl TraceClass {
    /// The chain from the root-most ancestor down to this class.
    #[must_use]
    pub fn ancestry(&self) -> Vec<&Self> {
        let mut chain = Vec::new();
        let mut current = Some(self);
        while let Some(class) = current {
            chain.push(class);
            current = class.parent().map(Arc::as_ref);
        }
        chain.reverse();
        chain
    }

    /// Ordered layer declarations applicable to `mode` at this class.
    #[must_use]
    pub fn resolve(&self, mode: &ModeName) -> Vec<Arc<LayerDeclaration>> {
        let mut resolved = Vec::new();
        for class in self.ancestry() {
            let regs = class.registrations();
            resolved.extend(
                regs.layers
                    .iter()
                    .filter(|decl| decl.scope().is_all())
                    .cloned(),
            );
            resolved.extend(
                regs.layers
                    .iter()
                    .filter(|decl| decl.scope().names(mode))
                    .cloned(),
            );
        }
        resolved
    }

    /// The mode used when a request carries no hint.
    ///
    /// Nearest ancestor-or-self override, else [`ModeName::DEFAULT`].
    #[must_use]
    pub fn default_mode(&self) -> ModeName {
        self.nearest(|class| class.registrations().default_mode.clone())
            .unwrap_or(ModeName::DEFAULT)
    }

    /// Every mode named anywhere in the ancestry, plus `default`.
    #[must_use]
    pub fn known_modes(&self) -> BTreeSet<ModeName> {
        let mut modes = BTreeSet::from([ModeName::DEFAULT]);
        for class in self.ancestry() {
            let regs = class.registrations();
            modes.extend(regs.declared_modes.iter().cloned());
            modes.extend(regs.mode_bases.keys().cloned());
            modes.extend(regs.default_mode.iter().cloned());
            for decl in &regs.layers {
                modes.extend(decl.scope().modes().cloned());
            }
        }
        modes
    }

    /// Returns `true` if `mode` is named anywhere in the ancestry.
    #[must_use]
    pub fn is_known_mode(&self, mode: &ModeName) -> bool {
        mode.is_default() || self.known_modes().contains(mode)
    }

    /// The base type pipelines for `mode` wrap.
    ///
    /// Walks leaf to root; at each level a per-mode base for `mode` wins
    /// over that level's class-wide base. Falls back to [`NullBase`].
    pub(crate) fn effective_base(&self, mode: &ModeName) -> Arc<dyn BaseTrace> {
        self.nearest(|class| {
            let regs = class.registrations();
            regs.mode_bases
                .get(mode)
                .or(regs.base.as_ref())
                .map(Arc::clone)
        })
        .unwrap_or_else(NullBase::shared)
    }

    /// Legacy tracers of the ancestry, root first, when any level declared
    /// the shim.
    pub(crate) fn legacy_tracers(&self) -> Option<Vec<Arc<dyn LegacyTracer>>> {
        let mut enabled = false;
        let mut tracers = Vec::new();
        for class in self.ancestry() {
            let regs = class.registrations();
            enabled |= regs.legacy_shim;
            tracers.extend(regs.legacy_tracers.iter().cloned());
        }
        enabled.then_some(tracers)
    }

    fn nearest<T>(&self, mut probe: impl FnMut(&Self) -> Option<T>) -> Option<T> {
        let mut current = Some(self);
        while let Some(class) = current {
            if let Some(found) = probe(class) {
                return Some(found);
            }
            current = class.parent().map(Arc::as_ref);
        }
        None
    }
}
