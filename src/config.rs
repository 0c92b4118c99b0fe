//! Engine configuration.
//!
//! Configuration is attached to a root class and shared by every descendant.
//! It can be built in code, read from the environment, or (with the
//! `config-file` feature) parsed from TOML:
//!
//! ```toml
//! build_policy = "serialized"
//! warn_on_unknown_mode = false
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Environment variable selecting the [`BuildPolicy`].
pub const ENV_BUILD_POLICY: &str = "TRACEMODE_BUILD_POLICY";
/// Environment variable toggling unknown-mode warnings.
pub const ENV_WARN_UNKNOWN_MODE: &str = "TRACEMODE_WARN_UNKNOWN_MODE";

/// How concurrent first-time builds of one (class, mode) pair are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildPolicy {
    /// Concurrent callers may each fold the pipeline; the first published
    /// result is kept. Builds are pure, so duplicates are harmless.
    #[default]
    Optimistic,
    /// A per-class lock ensures each (class, mode) pipeline is folded once.
    Serialized,
}

impl BuildPolicy {
    /// Returns the policy name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Optimistic => "optimistic",
            Self::Serialized => "serialized",
        }
    }
}

impl fmt::Display for BuildPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "optimistic" => Ok(Self::Optimistic),
            "serialized" => Ok(Self::Serialized),
            _ => Err(ConfigError::invalid(ENV_BUILD_POLICY, s)),
        }
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A setting had a value that could not be parsed.
    #[error("invalid value {value:?} for {key}")]
    InvalidValue {
        /// Setting name.
        key: String,
        /// Rejected value.
        value: String,
    },

    /// A configuration file could not be read.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),

    /// A configuration file could not be parsed.
    #[cfg(feature = "config-file")]
    #[error("failed to parse config file")]
    Toml(#[from] toml::de::Error),
}

impl ConfigError {
    fn invalid(key: &str, value: &str) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

/// Settings shared by one class hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Concurrency policy for first-time builds.
    pub build_policy: BuildPolicy,
    /// Log a warning when a pipeline is built for a mode nobody declared.
    pub warn_on_unknown_mode: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            build_policy: BuildPolicy::Optimistic,
            warn_on_unknown_mode: true,
        }
    }
}

impl EngineConfig {
    /// Create a config with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the build policy.
    #[must_use]
    pub fn build_policy(mut self, policy: BuildPolicy) -> Self {
        self.build_policy = policy;
        self
    }

    /// Enable or disable unknown-mode warnings.
    #[must_use]
    pub fn warn_on_unknown_mode(mut self, warn: bool) -> Self {
        self.warn_on_unknown_mode = warn;
        self
    }

    /// Defaults overridden by `TRACEMODE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by values from `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(raw) = lookup(ENV_BUILD_POLICY) {
            config.build_policy = raw.parse()?;
        }
        if let Some(raw) = lookup(ENV_WARN_UNKNOWN_MODE) {
            config.warn_on_unknown_mode = parse_bool(ENV_WARN_UNKNOWN_MODE, &raw)?;
        }
        Ok(config)
    }

    /// Parse a TOML document; missing keys keep their defaults.
    #[cfg(feature = "config-file")]
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Read and parse a TOML file.
    #[cfg(feature = "config-file")]
    pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(key, raw)),
    }
}
