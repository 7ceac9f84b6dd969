//! Configuration management for apply-command.
//!
//! Handles loading and saving configuration from TOML files.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::PACKAGE_NAME;

/// Local config file name, looked up in the current directory.
pub const LOCAL_CONFIG_FILE: &str = ".apply-command.toml";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory holding command descriptors; `~` and `$VAR` are expanded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_directory: Option<String>,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Looks for config in:
    /// 1. `.apply-command.toml` in current directory
    /// 2. `~/.config/apply-command/config.toml`
    /// 3. Falls back to defaults
    pub fn load() -> anyhow::Result<Self> {
        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Some(global_config) = Self::global_config_path() {
            if global_config.exists() {
                return Self::load_from_file(&global_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        tracing::debug!(path = ?path, "Loaded configuration");
        Ok(config)
    }

    /// Save configuration to the global config file.
    pub fn save(&self) -> anyhow::Result<PathBuf> {
        let config_path = Self::global_config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        self.save_to_file(&config_path)?;
        Ok(config_path)
    }

    /// Save configuration to a specific file, creating parent directories.
    pub fn save_to_file(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Override the command directory.
    #[must_use]
    pub fn with_command_directory(mut self, directory: impl Into<String>) -> Self {
        self.general.command_directory = Some(directory.into());
        self
    }

    /// Resolved command directory.
    ///
    /// Expands `~` and environment variables in the configured value, or
    /// falls back to `<config dir>/apply-command/commands`.
    pub fn command_directory(&self) -> PathBuf {
        match self.general.command_directory.as_deref().filter(|d| !d.trim().is_empty()) {
            Some(dir) => match shellexpand::full(dir) {
                Ok(expanded) => PathBuf::from(expanded.as_ref()),
                Err(e) => {
                    tracing::warn!(
                        directory = dir,
                        error = %e,
                        "Failed to expand command directory"
                    );
                    PathBuf::from(dir)
                }
            },
            None => Self::default_command_directory(),
        }
    }

    /// Default command directory.
    pub fn default_command_directory() -> PathBuf {
        Self::config_dir().unwrap_or_else(|| PathBuf::from(".")).join("commands")
    }

    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(PACKAGE_NAME))
    }

    /// Get the global config file path.
    pub fn global_config_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("config.toml"))
    }
}
