//! Runtime configuration.
//!
//! Settings can come from code, from a TOML document, or from the
//! environment:
//!
//! ```toml
//! debug_log = true
//! track_performance = false
//! history = true
//! ```
//!
//! `HL_ELEMENTS_DEBUG` and `HL_ELEMENTS_TRACK_PERFORMANCE` override the
//! matching fields when set to `1`, `true` or `yes` (anything else turns the
//! setting off).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Environment variable overriding [`ElementsConfig::debug_log`].
pub const DEBUG_ENV: &str = "HL_ELEMENTS_DEBUG";
/// Environment variable overriding [`ElementsConfig::track_performance`].
pub const TRACK_PERFORMANCE_ENV: &str = "HL_ELEMENTS_TRACK_PERFORMANCE";

/// Error loading a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The document is not valid TOML for this configuration.
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Configuration of a [`Host`](crate::Host).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ElementsConfig {
    /// Emit per-instance debug messages.
    pub debug_log: bool,
    /// Emit render performance marks.
    pub track_performance: bool,
    /// Whether the runtime supports query-string history. When off, tab sets
    /// neither read nor write the location.
    pub history: bool,
}

impl Default for ElementsConfig {
    fn default() -> Self {
        Self {
            debug_log: false,
            track_performance: false,
            history: true,
        }
    }
}

impl ElementsConfig {
    /// Parse a TOML document. Missing fields keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Read a TOML file and apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&source)?;
        config.apply_env();
        tracing::debug!(target: crate::logging::targets::CORE, path = %path.display(), ?config, "configuration loaded");
        Ok(config)
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Apply environment overrides in place.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = lookup(DEBUG_ENV) {
            self.debug_log = is_enabled(&value);
        }
        if let Some(value) = lookup(TRACK_PERFORMANCE_ENV) {
            self.track_performance = is_enabled(&value);
        }
    }

    /// Builder-style setter for `debug_log`.
    pub fn with_debug_log(mut self, enabled: bool) -> Self {
        self.debug_log = enabled;
        self
    }

    /// Builder-style setter for `track_performance`.
    pub fn with_track_performance(mut self, enabled: bool) -> Self {
        self.track_performance = enabled;
        self
    }

    /// Builder-style setter for `history`.
    pub fn with_history(mut self, enabled: bool) -> Self {
        self.history = enabled;
        self
    }
}

fn is_enabled(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}
