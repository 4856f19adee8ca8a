//! Configuration file I/O operations

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::Config;
use crate::atomic_file;

impl Config {
    /// Get the global config directory path (~/.valtrix/)
    pub fn global_config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".valtrix")
    }

    /// Get the global config file path (~/.valtrix/config.toml)
    pub fn global_config_path() -> PathBuf {
        Self::global_config_dir().join("config.toml")
    }

    /// Load configuration from a file. Missing sections fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Save configuration with an exclusive lock and an atomic temp-file rename
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        atomic_file::write(path, self.to_toml()?.as_bytes())
    }

    /// Load global configuration from ~/.valtrix/config.toml,
    /// creating it with defaults if it does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_or_init(&Self::global_config_path())
    }

    /// Load `path`, writing a default config there first if it is missing
    pub fn load_or_init(path: &Path) -> Result<Self> {
        if !path.exists() {
            Self::auto_init(path)?;
        }
        Self::from_file(path)
    }

    /// Uses the lock file so concurrent processes do not both initialize
    fn auto_init(path: &Path) -> Result<()> {
        let _lock = atomic_file::lock(path)?;

        // Another process may have won the race
        if path.exists() {
            return Ok(());
        }

        atomic_file::replace(path, Self::default().to_toml()?.as_bytes())?;
        tracing::info!("Created {}", path.display());
        Ok(())
    }

    fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).with_context(|| "Failed to serialize config")
    }
}
