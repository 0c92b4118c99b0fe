//! Error types for trace-mode resolution and instantiation.
//!
//! All errors are synchronous and local to one resolve/build/instantiate
//! call chain. None of them leave partial state behind: declarations are
//! append-only and pipeline builds are pure, so a failed instantiation never
//! touches a class's pipeline cache.

use crate::mode::ModeName;
use thiserror::Error;

/// Errors produced while registering or instantiating trace pipelines.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TraceModeError {
    /// A required construction parameter was neither supplied nor defaulted.
    #[error("missing parameter `{parameter}` required by `{capability}` (mode {mode})")]
    MissingParameter {
        /// The parameter name.
        parameter: String,
        /// The capability that declared the parameter.
        capability: String,
        /// The mode being instantiated.
        mode: ModeName,
    },

    /// A supplied parameter could not be decoded into the type a layer expects.
    #[error("invalid parameter `{parameter}`: {message}")]
    InvalidParameter {
        /// The parameter name.
        parameter: String,
        /// Decoder message.
        message: String,
    },

    /// A layer was declared for an empty set of modes.
    #[error("layer `{capability}` declared with an empty mode set")]
    EmptyScope {
        /// The capability being declared.
        capability: String,
    },

    /// A layer or base constructor refused to build.
    #[error("failed to construct `{capability}`: {message}")]
    Construction {
        /// The capability or base type that failed.
        capability: String,
        /// Constructor message.
        message: String,
    },
}

impl TraceModeError {
    /// Creates a construction error for the named capability.
    #[must_use]
    pub fn construction(capability: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Construction {
            capability: capability.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if this is a missing-parameter error.
    #[must_use]
    pub const fn is_missing_parameter(&self) -> bool {
        matches!(self, Self::MissingParameter { .. })
    }

    /// Returns the parameter name for parameter errors.
    #[must_use]
    pub fn parameter(&self) -> Option<&str> {
        match self {
            Self::MissingParameter { parameter, .. } | Self::InvalidParameter { parameter, .. } => {
                Some(parameter)
            }
            Self::EmptyScope { .. } | Self::Construction { .. } => None,
        }
    }

    /// Returns the capability name for errors attributed to one.
    #[must_use]
    pub fn capability(&self) -> Option<&str> {
        match self {
            Self::MissingParameter { capability, .. }
            | Self::EmptyScope { capability }
            | Self::Construction { capability, .. } => Some(capability),
            Self::InvalidParameter { .. } => None,
        }
    }
}

/// Result type for trace-mode operations.
pub type Result<T, E = TraceModeError> = std::result::Result<T, E>;
