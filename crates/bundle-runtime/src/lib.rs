//! # bundle-runtime
//!
//! Bundle discovery for extforge.
//!
//! This crate provides:
//! - Extension manifest parsing and validation
//! - Recursive bundle tree walking
//! - An index keyed by manifest identifier and by normalised bundle path
//! - Reconciliation of registry identifiers against that index
//!
//! ## Bundle Structure
//!
//! A bundle tree is a directory of (possibly nested) bundle directories.
//! Each bundle directory contains:
//! - `manifest.toml` - Extension metadata (identifier, capability, entry file)
//! - the entry file named by the manifest, declaring the bundle's types
//!
//! Malformed manifests are skipped; a missing tree is an empty index.

pub mod discovery;
pub mod error;
pub mod manifest;
pub mod path;
pub mod resolve;

pub use discovery::{build_index, BundleEntry, BundleIndex, MANIFEST_FILE_NAME};
pub use error::{RuntimeError, RuntimeResult};
pub use manifest::{ActivationStatus, ExtensionManifest, ManifestFile};
pub use path::normalize_bundle_path;
pub use resolve::resolve_identifier;
