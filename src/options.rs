//! Declared construction options and caller-supplied parameters.
//!
//! Each layer declaration names the parameters its capability needs at
//! construction time. For one (class, mode) pair those declarations are
//! unioned in resolution order; on a duplicate name the later-resolved
//! declaration wins, mirroring the layering order.

use crate::class::LayerDeclaration;
use crate::error::{Result, TraceModeError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::sync::Arc;

/// A named construction parameter declared by a layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionSpec {
    name: String,
    default: Option<Value>,
}

impl OptionSpec {
    /// A parameter the caller must supply.
    #[must_use]
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    /// A parameter with a fallback value.
    #[must_use]
    pub fn with_default(name: impl Into<String>, default: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            default: Some(default.into()),
        }
    }

    /// Returns the parameter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared default, if any.
    #[must_use]
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Returns `true` when no default was declared.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// The options map attached to one layer declaration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerOptions {
    specs: BTreeMap<String, OptionSpec>,
}

impl LayerOptions {
    /// Creates an empty options map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a required parameter.
    #[must_use]
    pub fn required(self, name: impl Into<String>) -> Self {
        self.with_spec(OptionSpec::required(name))
    }

    /// Declares a parameter with a default value.
    #[must_use]
    pub fn with_default(self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.with_spec(OptionSpec::with_default(name, default))
    }

    /// Adds a prepared spec, replacing any earlier spec of the same name.
    #[must_use]
    pub fn with_spec(mut self, spec: OptionSpec) -> Self {
        self.specs.insert(spec.name.clone(), spec);
        self
    }

    /// Looks up a spec by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&OptionSpec> {
        self.specs.get(name)
    }

    /// Iterates specs in name order.
    pub fn iter(&self) -> impl Iterator<Item = &OptionSpec> {
        self.specs.values()
    }

    /// Number of declared parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Returns `true` when nothing is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

/// A parameter in an aggregated option set, with the capability that
/// contributed it.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedOption {
    spec: OptionSpec,
    capability: String,
}

impl AggregatedOption {
    /// The winning spec.
    #[must_use]
    pub fn spec(&self) -> &OptionSpec {
        &self.spec
    }

    /// Name of the capability whose declaration won.
    #[must_use]
    pub fn capability(&self) -> &str {
        &self.capability
    }
}

/// Merged parameters required by one composed pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionSet {
    entries: BTreeMap<String, AggregatedOption>,
}

impl OptionSet {
    /// Looks up a parameter.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AggregatedOption> {
        self.entries.get(name)
    }

    /// Returns `true` if the parameter is part of the set.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Parameter names in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterates `(name, option)` pairs in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AggregatedOption)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Parameters without a default.
    pub fn required(&self) -> impl Iterator<Item = &AggregatedOption> {
        self.entries.values().filter(|o| o.spec.is_required())
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no layer declared parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Unions the options of `declarations`, in order, last declared wins.
#[must_use]
pub fn aggregate_options(declarations: &[Arc<LayerDeclaration>]) -> OptionSet {
    let mut entries = BTreeMap::new();
    for decl in declarations {
        for spec in decl.options().iter() {
            entries.insert(
                spec.name.clone(),
                AggregatedOption {
                    spec: spec.clone(),
                    capability: decl.capability_name().to_string(),
                },
            );
        }
    }
    OptionSet { entries }
}

/// Caller-supplied construction parameter values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceParams {
    values: BTreeMap<String, Value>,
}

impl TraceParams {
    /// Creates an empty parameter map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value, builder style.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Inserts a value, returning the previous one.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(name.into(), value.into())
    }

    /// Returns a raw value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Decodes a value into `T`.
    ///
    /// Returns `Ok(None)` when the parameter is absent.
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        self.values
            .get(name)
            .map(|value| {
                T::deserialize(value).map_err(|e| TraceModeError::InvalidParameter {
                    parameter: name.to_string(),
                    message: e.to_string(),
                })
            })
            .transpose()
    }

    /// Returns `true` if the parameter was supplied.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Iterates `(name, value)` pairs in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` when empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for TraceParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl IntoIterator for TraceParams {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}
