//! Error types for bundle discovery.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while discovering and resolving bundles.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// A manifest file could not be read or parsed.
    #[error("Invalid manifest at {path:?}: {message}")]
    ManifestParse { path: PathBuf, message: String },

    /// A manifest parsed but failed validation.
    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    /// A registry identifier matched no bundle in the index.
    #[error("Extension not found in bundle index: {0}")]
    IdentifierNotFound(String),

    /// TOML parsing error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type for bundle runtime operations.
pub type RuntimeResult<T> = std::result::Result<T, RuntimeError>;
