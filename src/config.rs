//! TOML configuration.
//!
//! ```toml
//! [policy]
//! min_samples = 3
//! max_overlap = 3
//! min_cluster_size = 2
//!
//! [window]
//! start = "2010.01"
//! end = "2012.12"
//! ```
//!
//! Every key is optional; missing ones take the defaults. Command line flags
//! override file values.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::policy::{PolicyError, ResolutionPolicy};
use crate::window::Month;

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path of the file.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The file is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    /// Policy values rejected.
    #[error("invalid policy: {0}")]
    Policy(#[from] PolicyError),
    /// Window end before start.
    #[error("window end {end} is before start {start}")]
    WindowOrder {
        /// First month.
        start: Month,
        /// Last month.
        end: Month,
    },
}

/// Window bounds for the windowed driver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// First month, inclusive.
    pub start: Option<Month>,
    /// Last month, inclusive.
    pub end: Option<Month>,
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Resolution thresholds.
    pub policy: ResolutionPolicy,
    /// Window bounds.
    pub window: WindowConfig,
}

impl Config {
    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), policy = ?config.policy, "Config loaded");
        Ok(config)
    }

    /// Check policy and window bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.policy.validate()?;
        if let (Some(start), Some(end)) = (self.window.start, self.window.end) {
            if end < start {
                return Err(ConfigError::WindowOrder { start, end });
            }
        }
        Ok(())
    }
}
