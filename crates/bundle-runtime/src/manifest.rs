//! Extension manifest parsing.
//!
//! Each bundle has a `manifest.toml` file that describes its identifier,
//! the capability it implements, where its entry file lives and the
//! namespace its types are declared under.

use crate::error::{RuntimeError, RuntimeResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// On-disk layout of `manifest.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestFile {
    /// Extension metadata.
    pub extension: ExtensionManifest,
}

/// Extension metadata, parsed fresh on every discovery pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionManifest {
    /// Identifier, unique within a bundle tree.
    pub identifier: String,

    /// Capability tag this extension implements (e.g. "verification").
    pub capability: String,

    /// Human-readable name.
    #[serde(default)]
    pub display_name: String,

    /// Entry file, relative to the bundle directory.
    pub entry_file: String,

    /// Namespace prefix the entry file declares its types under. May be empty.
    #[serde(default)]
    pub namespace: String,

    /// Status embedded in the manifest, used only in degraded mode.
    #[serde(default)]
    pub status: ActivationStatus,

    /// Installation flag embedded in the manifest, used only in degraded mode.
    #[serde(default)]
    pub installed: bool,

    /// Version string.
    #[serde(default)]
    pub version: Option<String>,

    /// Extension description.
    #[serde(default)]
    pub description: Option<String>,

    /// Extension author(s).
    #[serde(default)]
    pub authors: Vec<String>,
}

/// Enabled/disabled flag as written in a manifest or an activation record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationStatus {
    Enabled,
    #[default]
    Disabled,
}

impl ActivationStatus {
    /// Parse a status string. Anything other than "enabled" is disabled.
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("enabled") {
            ActivationStatus::Enabled
        } else {
            ActivationStatus::Disabled
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivationStatus::Enabled => "enabled",
            ActivationStatus::Disabled => "disabled",
        }
    }
}

impl ExtensionManifest {
    /// Load a manifest from a TOML file.
    pub fn from_file(path: &Path) -> RuntimeResult<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| RuntimeError::ManifestParse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        Self::from_str(&content).map_err(|e| RuntimeError::ManifestParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Parse a manifest from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> RuntimeResult<Self> {
        let file: ManifestFile = toml::from_str(content)?;
        file.extension.validate()?;
        Ok(file.extension)
    }

    fn validate(&self) -> RuntimeResult<()> {
        if self.identifier.trim().is_empty() {
            return Err(RuntimeError::InvalidManifest(
                "Extension identifier cannot be empty".to_string(),
            ));
        }

        if self.capability.trim().is_empty() {
            return Err(RuntimeError::InvalidManifest(format!(
                "Extension '{}' has an empty capability",
                self.identifier
            )));
        }

        if self.entry_file.trim().is_empty() {
            return Err(RuntimeError::InvalidManifest(format!(
                "Extension '{}' has an empty entry_file",
                self.identifier
            )));
        }

        if Path::new(&self.entry_file).is_absolute() {
            return Err(RuntimeError::InvalidManifest(format!(
                "Extension '{}': entry_file must be relative to the bundle",
                self.identifier
            )));
        }

        Ok(())
    }

    /// Base name of the entry file without its extension.
    pub fn entry_stem(&self) -> &str {
        Path::new(&self.entry_file)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(self.entry_file.as_str())
    }

    /// The type name the entry file is expected to declare:
    /// `namespace` followed by the entry file's base name.
    pub fn canonical_type_name(&self) -> String {
        format!("{}{}", self.namespace, self.entry_stem())
    }

    /// Whether the manifest's own flags mark it installed and enabled.
    pub fn is_embedded_active(&self) -> bool {
        self.installed && self.status == ActivationStatus::Enabled
    }

    /// Display name, falling back to the identifier.
    pub fn name(&self) -> &str {
        if self.display_name.is_empty() {
            &self.identifier
        } else {
            &self.display_name
        }
    }
}
