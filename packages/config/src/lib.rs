#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Runtime configuration for the violation map toolchain.
//!
//! Settings are resolved in three layers: the defaults in `default.toml`
//! (embedded at compile time), an optional TOML file supplied by the user,
//! and finally environment variables.

use std::path::{Path, PathBuf};

use cpa_map_cluster::ClusterThreshold;
use serde::Deserialize;

/// Defaults compiled into the binary.
const DEFAULT_TOML: &str = include_str!("../default.toml");

/// Environment variable overriding [`MapConfig::cluster_threshold`].
pub const ENV_CLUSTER_THRESHOLD: &str = "CPA_MAP_CLUSTER_THRESHOLD";
/// Environment variable overriding [`MapConfig::data_dir`].
pub const ENV_DATA_DIR: &str = "CPA_MAP_DATA_DIR";
/// Environment variable overriding [`MapConfig::bind_addr`].
pub const ENV_BIND_ADDR: &str = "BIND_ADDR";
/// Environment variable overriding [`MapConfig::port`].
pub const ENV_PORT: &str = "PORT";

/// Errors that can occur while resolving configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML or has wrong types.
    #[error("Invalid config TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// An environment override could not be parsed.
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue {
        /// Variable name.
        key: &'static str,
        /// Rejected value.
        value: String,
    },
}

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MapConfig {
    /// Merge distance for the proximity clusterer.
    pub cluster_threshold: ClusterThreshold,
    /// Directory holding the JSON record stores.
    pub data_dir: PathBuf,
    /// HTTP listen address.
    pub bind_addr: String,
    /// HTTP listen port.
    pub port: u16,
}

/// A config file layer. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigOverlay {
    cluster_threshold: Option<ClusterThreshold>,
    data_dir: Option<PathBuf>,
    bind_addr: Option<String>,
    port: Option<u16>,
}

impl Default for MapConfig {
    /// The embedded defaults.
    ///
    /// # Panics
    ///
    /// Panics if the embedded `default.toml` is malformed, which is a
    /// development error caught by tests.
    fn default() -> Self {
        toml::from_str(DEFAULT_TOML)
            .unwrap_or_else(|e| panic!("Failed to parse embedded default.toml: {e}"))
    }
}

impl MapConfig {
    /// Resolves configuration from defaults, an optional file, and the
    /// process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or an
    /// environment override is malformed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = path {
            let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            config.apply_toml(&contents)?;
            log::info!("Loaded config from {}", path.display());
        }

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Overlays the fields present in `contents` onto `self`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] if `contents` is not a valid overlay.
    pub fn apply_toml(&mut self, contents: &str) -> Result<(), ConfigError> {
        let overlay: ConfigOverlay = toml::from_str(contents)?;

        if let Some(threshold) = overlay.cluster_threshold {
            self.cluster_threshold = threshold;
        }
        if let Some(dir) = overlay.data_dir {
            self.data_dir = dir;
        }
        if let Some(addr) = overlay.bind_addr {
            self.bind_addr = addr;
        }
        if let Some(port) = overlay.port {
            self.port = port;
        }
        Ok(())
    }

    /// Applies environment overrides, reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a threshold or port
    /// override does not parse.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_CLUSTER_THRESHOLD) {
            self.cluster_threshold = value
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(|d| ClusterThreshold::new(d).ok())
                .ok_or(ConfigError::InvalidValue {
                    key: ENV_CLUSTER_THRESHOLD,
                    value,
                })?;
        }
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(addr) = lookup(ENV_BIND_ADDR) {
            self.bind_addr = addr;
        }
        if let Some(value) = lookup(ENV_PORT) {
            self.port = value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_PORT,
                value,
            })?;
        }
        Ok(())
    }
}
