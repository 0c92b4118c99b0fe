//! Trace classes and their registration stores.
//!
//! A [`TraceClass`] is one node of a class hierarchy with an explicit parent
//! pointer. Each node owns its registrations and its pipeline cache; nothing
//! is shared with ancestors except through resolution.
//!
//! Registrations are append-only. Adding a declaration after a pipeline was
//! built does not invalidate that pipeline; call
//! [`reset_cache`](TraceClass::reset_cache) to pick the change up.

use crate::base::BaseTrace;
use crate::config::EngineConfig;
use crate::error::{Result, TraceModeError};
use crate::layer::TraceLayer;
use crate::legacy::LegacyTracer;
use crate::mode::{ModeName, ModeScope};
use crate::options::LayerOptions;
use crate::pipeline::PipelineCache;
use crate::tracing_compat::debug;
use parking_lot::{RwLock, RwLockReadGuard};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

/// One registered instrumentation layer.
pub struct LayerDeclaration {
    capability: Arc<dyn TraceLayer>,
    scope: ModeScope,
    options: LayerOptions,
    declaring_class: String,
}

impl LayerDeclaration {
    /// Creates a declaration.
    pub fn new(
        capability: Arc<dyn TraceLayer>,
        scope: ModeScope,
        options: LayerOptions,
        declaring_class: impl Into<String>,
    ) -> Self {
        Self {
            capability,
            scope,
            options,
            declaring_class: declaring_class.into(),
        }
    }

    /// The capability this declaration layers on.
    #[must_use]
    pub fn capability(&self) -> &Arc<dyn TraceLayer> {
        &self.capability
    }

    /// Shorthand for the capability's name.
    #[must_use]
    pub fn capability_name(&self) -> &str {
        self.capability.name()
    }

    /// Modes this declaration is visible in.
    #[must_use]
    pub fn scope(&self) -> &ModeScope {
        &self.scope
    }

    /// Construction parameters the capability needs.
    #[must_use]
    pub fn options(&self) -> &LayerOptions {
        &self.options
    }

    /// Name of the class that issued the registration.
    #[must_use]
    pub fn declaring_class(&self) -> &str {
        &self.declaring_class
    }
}

impl fmt::Debug for LayerDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayerDeclaration")
            .field("capability", &self.capability_name())
            .field("scope", &self.scope)
            .field("options", &self.options)
            .field("declaring_class", &self.declaring_class)
            .finish()
    }
}

/// A class's own registrations.
#[derive(Default)]
pub(crate) struct Registrations {
    pub(crate) layers: Vec<Arc<LayerDeclaration>>,
    pub(crate) base: Option<Arc<dyn BaseTrace>>,
    pub(crate) mode_bases: HashMap<ModeName, Arc<dyn BaseTrace>>,
    pub(crate) declared_modes: BTreeSet<ModeName>,
    pub(crate) default_mode: Option<ModeName>,
    pub(crate) legacy_shim: bool,
    pub(crate) legacy_tracers: Vec<Arc<dyn LegacyTracer>>,
}

/// Per-class configuration: registrations plus the lazily built cache.
#[derive(Default)]
pub(crate) struct ClassConfig {
    pub(crate) registrations: RwLock<Registrations>,
    pub(crate) cache: PipelineCache,
}

/// A node in a trace class hierarchy.
///
/// ```
/// use tracemode::{LayerOptions, ModeName, TraceClass, layer_fn};
///
/// let schema = TraceClass::root("Schema");
/// schema
///     .declare_layer(layer_fn("timing", |inner, _| Ok(inner)), None, LayerOptions::new())
///     .unwrap();
///
/// let child = TraceClass::subclass(&schema, "ChildSchema");
/// let pipeline = child.pipeline_for(ModeName::DEFAULT);
/// assert_eq!(pipeline.layer_names(), vec!["timing"]);
/// ```
pub struct TraceClass {
    name: String,
    parent: Option<Arc<TraceClass>>,
    config: ClassConfig,
    engine: Arc<EngineConfig>,
}

impl TraceClass {
    /// Creates a root class with the default engine configuration.
    #[must_use]
    pub fn root(name: impl Into<String>) -> Arc<Self> {
        Self::root_with_config(name, EngineConfig::default())
    }

    /// Creates a root class with an explicit engine configuration.
    ///
    /// Every descendant shares this configuration.
    #[must_use]
    pub fn root_with_config(name: impl Into<String>, engine: EngineConfig) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            parent: None,
            config: ClassConfig::default(),
            engine: Arc::new(engine),
        })
    }

    /// Creates a class deriving from `parent`.
    #[must_use]
    pub fn subclass(parent: &Arc<Self>, name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            parent: Some(Arc::clone(parent)),
            config: ClassConfig::default(),
            engine: Arc::clone(&parent.engine),
        })
    }

    /// Returns the class name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the direct parent, if any.
    #[must_use]
    pub fn parent(&self) -> Option<&Arc<Self>> {
        self.parent.as_ref()
    }

    /// Returns the engine configuration shared by this hierarchy.
    #[must_use]
    pub fn engine_config(&self) -> &EngineConfig {
        &self.engine
    }

    /// Returns `true` if `ancestor` is this class or one of its ancestors.
    #[must_use]
    pub fn inherits_from(&self, ancestor: &Self) -> bool {
        let mut current = Some(self);
        while let Some(class) = current {
            if std::ptr::eq(class, ancestor) {
                return true;
            }
            current = class.parent.as_deref();
        }
        false
    }

    // -- registration ------------------------------------------------------

    /// Appends a layer declaration to this class.
    ///
    /// `scope` accepts `None` (every mode), a mode name, or a list of names.
    pub fn declare_layer(
        &self,
        capability: Arc<dyn TraceLayer>,
        scope: impl Into<ModeScope>,
        options: LayerOptions,
    ) -> Result<()> {
        let scope = scope.into();
        if scope.is_empty_set() {
            return Err(TraceModeError::EmptyScope {
                capability: capability.name().to_string(),
            });
        }
        debug!(
            class = %self.name,
            capability = capability.name(),
            scope = ?scope,
            "declared trace layer"
        );
        let decl = LayerDeclaration::new(capability, scope, options, self.name.clone());
        self.config.registrations.write().layers.push(Arc::new(decl));
        Ok(())
    }

    /// Overrides the base type for this class and undeclared descendants.
    pub fn set_base_type(&self, base: Arc<dyn BaseTrace>) {
        self.config.registrations.write().base = Some(base);
    }

    /// Names a mode explicitly, optionally giving it its own base type.
    ///
    /// A per-mode base takes precedence over a class-wide base set at the
    /// same level of the hierarchy.
    pub fn declare_mode(&self, mode: impl Into<ModeName>, base: Option<Arc<dyn BaseTrace>>) {
        let mode = mode.into();
        let mut regs = self.config.registrations.write();
        if let Some(base) = base {
            regs.mode_bases.insert(mode.clone(), base);
        }
        regs.declared_modes.insert(mode);
    }

    /// Overrides the mode used when a request carries no mode hint.
    pub fn set_default_mode(&self, mode: impl Into<ModeName>) {
        self.config.registrations.write().default_mode = Some(mode.into());
    }

    /// Enables the legacy compatibility shim for this class and descendants.
    pub fn declare_legacy_shim(&self) {
        self.config.registrations.write().legacy_shim = true;
    }

    /// Adds a legacy tracer; implies [`declare_legacy_shim`](Self::declare_legacy_shim).
    pub fn add_legacy_tracer(&self, tracer: Arc<dyn LegacyTracer>) {
        let mut regs = self.config.registrations.write();
        regs.legacy_shim = true;
        regs.legacy_tracers.push(tracer);
    }

    /// This class's own declarations, in insertion order.
    #[must_use]
    pub fn own_declarations(&self) -> Vec<Arc<LayerDeclaration>> {
        self.config.registrations.read().layers.clone()
    }

    pub(crate) fn registrations(&self) -> RwLockReadGuard<'_, Registrations> {
        self.config.registrations.read()
    }

    pub(crate) fn cache(&self) -> &PipelineCache {
        &self.config.cache
    }
}

impl fmt::Debug for TraceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceClass")
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|p| p.name()))
            .finish_non_exhaustive()
    }
}
