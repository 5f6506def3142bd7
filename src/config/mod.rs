//! Runtime configuration.
//!
//! A configuration file is optional; every field has a default.
//!
//! ```toml
//! # Directory template names are resolved against.
//! root = "templates"
//!
//! # "enabled" keeps compiled templates until they are evicted,
//! # "disabled" re-resolves every template on every render.
//! cache = "enabled"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::constants::DEFAULT_TEMPLATE_ROOT;
use crate::templating::CacheMode;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(#[source] toml::de::Error),
}

/// Settings used to build a [`Runtime`](crate::templating::Runtime).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Template root directory.
    pub root: PathBuf,
    pub cache: CacheMode,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_TEMPLATE_ROOT),
            cache: CacheMode::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load a configuration file.
    ///
    /// A relative `root` is taken relative to the file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        if config.root.is_relative() {
            if let Some(dir) = path.parent() {
                config.root = dir.join(&config.root);
            }
        }
        tracing::debug!(path = %path.display(), root = %config.root.display(), cache = %config.cache, "loaded config");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::Invalid)
    }
}
