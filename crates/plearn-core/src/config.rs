//! Runtime configuration (plearn.toml)
//!
//! The current configuration seeds every new [`PStream`](crate::stream::PStream)
//! and the help system. It can be loaded from a TOML file, overridden from
//! the environment, and replaced at runtime with [`set_current`].

use crate::error::{PLearnError, PResult};
use crate::option::OptionLevel;
use crate::stream::{PointerMode, StreamMode};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable overriding [`PLearnConfig::save_format`]
pub const ENV_SAVE_FORMAT: &str = "PLEARN_SAVE_FORMAT";
/// Environment variable overriding [`PLearnConfig::pointer_mode`]
pub const ENV_POINTER_MODE: &str = "PLEARN_POINTER_MODE";
/// Environment variable overriding [`PLearnConfig::max_nesting_depth`]
pub const ENV_MAX_NESTING_DEPTH: &str = "PLEARN_MAX_NESTING_DEPTH";

/// Object core configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PLearnConfig {
    /// Encoding used when saving objects without an explicit format
    pub save_format: StreamMode,

    /// How shared sub-objects are written
    pub pointer_mode: PointerMode,

    /// Maximum nesting of object definitions while reading
    pub max_nesting_depth: usize,

    /// Log a warning when an unknown option is skipped
    pub warn_unknown_options: bool,

    /// Most detailed option level shown by the help system
    pub help_level: OptionLevel,
}

impl Default for PLearnConfig {
    fn default() -> Self {
        Self {
            save_format: StreamMode::PlearnAscii,
            pointer_mode: PointerMode::Shared,
            max_nesting_depth: 256,
            warn_unknown_options: true,
            help_level: OptionLevel::Advanced,
        }
    }
}

impl PLearnConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(content: &str) -> PResult<Self> {
        let config: PLearnConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn load(path: impl AsRef<Path>) -> PResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Apply overrides from `PLEARN_*` environment variables
    pub fn with_env_overrides(mut self) -> PResult<Self> {
        if let Ok(format) = std::env::var(ENV_SAVE_FORMAT) {
            self.save_format = format.parse()?;
        }
        if let Ok(mode) = std::env::var(ENV_POINTER_MODE) {
            self.pointer_mode = mode.parse()?;
        }
        if let Ok(depth) = std::env::var(ENV_MAX_NESTING_DEPTH) {
            self.max_nesting_depth = depth.trim().parse().map_err(|_| {
                PLearnError::runtime(format!(
                    "{} must be a positive integer, got '{}'",
                    ENV_MAX_NESTING_DEPTH, depth
                ))
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> PResult<()> {
        if self.max_nesting_depth == 0 {
            return Err(PLearnError::runtime(
                "max_nesting_depth must be at least 1",
            ));
        }
        Ok(())
    }
}

static CURRENT: Lazy<RwLock<PLearnConfig>> = Lazy::new(|| RwLock::new(PLearnConfig::default()));

/// Snapshot of the process-wide configuration
pub fn current() -> PLearnConfig {
    CURRENT.read().clone()
}

/// Replace the process-wide configuration
pub fn set_current(config: PLearnConfig) {
    log::debug!("installing configuration {:?}", config);
    *CURRENT.write() = config;
}
