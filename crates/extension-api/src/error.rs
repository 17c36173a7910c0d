//! Error types for extension loading and activation.
//!
//! Every variant here is local to the one extension being resolved.
//! Callers log it and move on; none of them is fatal to a capability query.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or activating an extension.
#[derive(Error, Debug)]
pub enum ExtensionError {
    /// The entry file could not be read or is not a valid entry file.
    #[error("Entry file unreadable at {path:?}: {message}")]
    EntryFileUnreadable { path: PathBuf, message: String },

    /// No implementation type could be determined for a bundle.
    #[error("No implementation type found for extension '{0}'")]
    TypeResolution(String),

    /// The implementation type could not be constructed.
    #[error("Failed to construct '{type_name}': {message}")]
    ActivationConstruction { type_name: String, message: String },

    /// Persisted configuration could not be decoded.
    #[error("Configuration decode error: {0}")]
    ConfigDecode(#[from] serde_json::Error),

    /// An extension rejected the configuration it was given.
    #[error("Configuration rejected: {0}")]
    ConfigRejected(String),
}

/// Result type for extension operations.
pub type ExtensionResult<T> = std::result::Result<T, ExtensionError>;
