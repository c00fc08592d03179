//! Store configuration (`navtabs.toml`)
//!
//! Every field has a default, so an absent or partial file is valid.
//! All execution contexts read the same values from here instead of
//! carrying their own constants.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default config file name inside the data directory
pub const CONFIG_FILE_NAME: &str = "navtabs.toml";

/// Errors loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("Failed to parse config {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Storage and migration settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Serialized size above which a record is chunked, and the size of each chunk.
    /// Must stay below the synced area's 8 KB per-item ceiling once the key and
    /// JSON string escaping are added.
    pub chunk_size_threshold: usize,

    /// Writes needing more chunks than this are rejected
    pub max_chunk_count: usize,

    /// Chunk indices `0..orphan_sweep_limit` are removed on every save and clear
    pub orphan_sweep_limit: usize,

    /// `useSyncStorage` used when no settings have been saved yet
    pub default_use_sync_storage: bool,

    /// Name given to the profile created by migration
    pub default_profile_name: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            chunk_size_threshold: 7000,
            max_chunk_count: 50,
            orphan_sweep_limit: 50,
            default_use_sync_storage: true,
            default_profile_name: "Default".to_string(),
        }
    }
}

impl StoreConfig {
    /// Load and validate a config file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed, or fails validation
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file, falling back to defaults when it does not exist
    ///
    /// # Errors
    /// Returns an error if an existing file is unreadable or invalid
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Write the config as TOML
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        std::fs::write(path, content).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Check that the limits are usable
    ///
    /// # Errors
    /// Returns an error describing the first invalid field
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size_threshold == 0 {
            return Err(ConfigError::Invalid(
                "chunk_size_threshold must be greater than 0".to_string(),
            ));
        }
        if self.max_chunk_count == 0 {
            return Err(ConfigError::Invalid(
                "max_chunk_count must be greater than 0".to_string(),
            ));
        }
        if self.orphan_sweep_limit < self.max_chunk_count {
            return Err(ConfigError::Invalid(format!(
                "orphan_sweep_limit ({}) must cover max_chunk_count ({})",
                self.orphan_sweep_limit, self.max_chunk_count
            )));
        }
        if self.default_profile_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "default_profile_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}
