//! Core configuration.
//!
//! Replaces the upstream global settings object: callers hold a `CoreConfig`
//! and pass it explicitly into save paths instead of consulting shared
//! mutable state.

use crate::error::ApiError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Sort defaults applied when the caller does not specify options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortDefaults {
    /// Keep folders ahead of sniplets when sorting.
    #[serde(default = "default_true")]
    pub folders_first: bool,
}

impl Default for SortDefaults {
    fn default() -> Self {
        Self {
            folders_first: default_true(),
        }
    }
}

/// Configuration threaded into save/pack and processing paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Compress the tree into a packed blob on save (default: true).
    #[serde(default = "default_true")]
    pub compress: bool,

    /// BCP 47 locale driving date styles and ordinal suffixes.
    #[serde(default = "default_locale")]
    pub locale: String,

    /// Sort defaults.
    #[serde(default)]
    pub sort: SortDefaults,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            compress: default_true(),
            locale: default_locale(),
            sort: SortDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_locale() -> String {
    "en-US".to_string()
}

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from an optional TOML file plus `SNIPLETS_*`
    /// environment overrides. Defaults apply for anything unset.
    pub fn load(path: Option<&Path>) -> Result<CoreConfig, ApiError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        builder
            .add_source(config::Environment::with_prefix("SNIPLETS").separator("__"))
            .build()
            .and_then(|settings| settings.try_deserialize())
            .map_err(|e| ApiError::ConfigError(e.to_string()))
    }
}
