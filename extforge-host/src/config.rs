//! Configuration file loading and management
//!
//! This module handles loading and parsing the host configuration from
//! `$XDG_CONFIG_HOME/extforge/config.toml`. If the configuration file doesn't
//! exist, a default configuration is created with documented comments.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main host configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Host-wide settings
    #[serde(default)]
    pub host: HostConfig,
    /// Bundle tree location
    #[serde(default)]
    pub bundles: BundlesConfig,
    /// Activation registry database
    #[serde(default)]
    pub registry: RegistryConfig,
}

/// Host-wide settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HostConfig {
    /// Log level (trace, debug, info, warn, error)
    /// Default: "info"
    pub log_level: String,
}

/// Bundle tree configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BundlesConfig {
    /// Root of the bundle tree
    /// If None, uses XDG_DATA_HOME/extforge/bundles
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
}

/// Activation registry configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RegistryConfig {
    /// Path to the registry database (SQLite)
    /// If None, uses XDG_DATA_HOME/extforge/registry.db
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the specified path
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the default XDG config location
    ///
    /// If the configuration file doesn't exist, creates a default configuration
    /// file with documented comments.
    pub fn load_default() -> Result<Self> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_file(&config_path)?;
        }

        Self::load(&config_path)
    }

    /// Get the default configuration file path
    ///
    /// Returns `$XDG_CONFIG_HOME/extforge/config.toml`
    pub fn default_config_path() -> Result<PathBuf> {
        Ok(project_dirs()?.config_dir().join("config.toml"))
    }

    /// Create a default configuration file with documented comments
    fn create_default_file(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, Self::default_config_content())
            .with_context(|| format!("Failed to write default config file: {}", path.display()))?;

        tracing::info!("Created default configuration file at: {}", path.display());
        Ok(())
    }

    /// Generate the default configuration file content with comments
    fn default_config_content() -> String {
        r#"# extforge Host Configuration

[host]
# Log level: trace, debug, info, warn, error
# Default: "info"
log_level = "info"

[bundles]
# Root of the extension bundle tree. Every directory below it holding a
# manifest.toml is an extension bundle.
# If not specified, defaults to $XDG_DATA_HOME/extforge/bundles
# root = "/path/to/bundles"

[registry]
# Path to the SQLite activation registry
# If not specified, defaults to $XDG_DATA_HOME/extforge/registry.db
# If the database cannot be opened, extensions are resolved from the
# status flags embedded in their manifests instead.
# path = "/path/to/registry.db"
"#
        .to_string()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.host.log_level.as_str()) {
            anyhow::bail!(
                "Invalid log_level: {}. Must be one of: {}",
                self.host.log_level,
                valid_log_levels.join(", ")
            );
        }

        if let Some(root) = &self.bundles.root {
            if root.as_os_str().is_empty() {
                anyhow::bail!("bundles.root must not be empty");
            }
        }

        Ok(())
    }

    /// Get the bundle tree root
    pub fn bundle_root(&self) -> Result<PathBuf> {
        if let Some(ref root) = self.bundles.root {
            return Ok(root.clone());
        }

        Ok(project_dirs()?.data_dir().join("bundles"))
    }

    /// Get the registry database path
    pub fn registry_path(&self) -> Result<PathBuf> {
        if let Some(ref path) = self.registry.path {
            return Ok(path.clone());
        }

        Ok(project_dirs()?.data_dir().join("registry.db"))
    }
}

fn project_dirs() -> Result<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "raibid-labs", "extforge")
        .context("Failed to determine project directories")
}
