//! Mode names and layer scopes.

use serde::{Deserialize, Serialize};
use std::borrow::{Borrow, Cow};
use std::collections::BTreeSet;
use std::fmt;

/// Name of a trace mode.
///
/// `"default"` is reserved: it always exists, even when nothing was declared
/// for it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModeName(Cow<'static, str>);

impl ModeName {
    /// The implicit default mode.
    pub const DEFAULT: Self = Self(Cow::Borrowed("default"));

    /// Creates a mode name.
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for the reserved default mode.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.0 == Self::DEFAULT.0
    }
}

impl Default for ModeName {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for ModeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ModeName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for ModeName {
    fn from(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }
}

impl From<String> for ModeName {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

impl From<&ModeName> for ModeName {
    fn from(name: &ModeName) -> Self {
        name.clone()
    }
}

/// The set of modes a layer declaration applies to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ModeScope {
    /// Every mode, including modes nobody has named yet.
    #[default]
    All,
    /// Exactly these modes.
    Only(BTreeSet<ModeName>),
}

impl ModeScope {
    /// Scope covering a set of modes.
    pub fn only<I, M>(modes: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<ModeName>,
    {
        Self::Only(modes.into_iter().map(Into::into).collect())
    }

    /// Returns `true` for the `All` scope.
    #[must_use]
    pub const fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    /// Returns `true` if this scope names `mode` explicitly.
    ///
    /// `All` never names a mode; callers check [`is_all`](Self::is_all) first.
    #[must_use]
    pub fn names(&self, mode: &ModeName) -> bool {
        match self {
            Self::All => false,
            Self::Only(modes) => modes.contains(mode),
        }
    }

    /// Returns `true` if a declaration with this scope is visible in `mode`.
    #[must_use]
    pub fn applies_to(&self, mode: &ModeName) -> bool {
        self.is_all() || self.names(mode)
    }

    /// Iterates the explicitly named modes (empty for `All`).
    pub fn modes(&self) -> impl Iterator<Item = &ModeName> {
        let set = match self {
            Self::All => None,
            Self::Only(modes) => Some(modes),
        };
        set.into_iter().flatten()
    }

    pub(crate) fn is_empty_set(&self) -> bool {
        matches!(self, Self::Only(modes) if modes.is_empty())
    }
}

impl From<Option<&'static str>> for ModeScope {
    fn from(mode: Option<&'static str>) -> Self {
        mode.map_or(Self::All, |m| Self::only([m]))
    }
}

impl From<&'static str> for ModeScope {
    fn from(mode: &'static str) -> Self {
        Self::only([mode])
    }
}

impl From<String> for ModeScope {
    fn from(mode: String) -> Self {
        Self::only([mode])
    }
}

impl From<ModeName> for ModeScope {
    fn from(mode: ModeName) -> Self {
        Self::only([mode])
    }
}

impl<const N: usize> From<[&'static str; N]> for ModeScope {
    fn from(modes: [&'static str; N]) -> Self {
        Self::only(modes)
    }
}

impl From<Vec<ModeName>> for ModeScope {
    fn from(modes: Vec<ModeName>) -> Self {
        Self::only(modes)
    }
}

impl From<Vec<String>> for ModeScope {
    fn from(modes: Vec<String>) -> Self {
        Self::only(modes)
    }
}

impl From<Vec<&'static str>> for ModeScope {
    fn from(modes: Vec<&'static str>) -> Self {
        Self::only(modes)
    }
}
