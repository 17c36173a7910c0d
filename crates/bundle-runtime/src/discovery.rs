//! Bundle discovery from a bundle tree.
//!
//! The tree is walked recursively. Every directory containing a
//! `manifest.toml` is a bundle; walking continues into its subdirectories
//! so nested bundles are found too. Each bundle is registered under its
//! manifest identifier and under its directory path relative to the root.
//!
//! Discovery never fails: an unreadable root yields an empty index and an
//! unparseable manifest is logged and skipped.

use crate::manifest::ExtensionManifest;
use crate::path::relative_bundle_path;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Standard manifest file name.
pub const MANIFEST_FILE_NAME: &str = "manifest.toml";

/// A discovered bundle.
#[derive(Debug, Clone)]
pub struct BundleEntry {
    /// Parsed manifest.
    pub manifest: ExtensionManifest,

    /// Path to the bundle directory.
    pub dir: PathBuf,

    /// Bundle directory relative to the tree root, normalised.
    pub normalized_path: String,
}

impl BundleEntry {
    /// Get the extension identifier.
    pub fn identifier(&self) -> &str {
        &self.manifest.identifier
    }

    /// Get the path to the entry file.
    pub fn entry_file_path(&self) -> PathBuf {
        self.dir.join(&self.manifest.entry_file)
    }
}

/// Identifier and path index over one discovery pass.
#[derive(Debug, Clone, Default)]
pub struct BundleIndex {
    root: PathBuf,
    entries: Vec<BundleEntry>,
    by_identifier: HashMap<String, usize>,
    by_path: HashMap<String, usize>,
}

impl BundleIndex {
    /// Create an empty index rooted at `root`.
    pub fn empty(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    fn insert(&mut self, entry: BundleEntry) {
        let id = entry.manifest.identifier.clone();
        if self.by_identifier.contains_key(&id) {
            warn!(
                "Skipping duplicate extension identifier '{}' at {:?}",
                id, entry.dir
            );
            return;
        }

        let slot = self.entries.len();
        if !entry.normalized_path.is_empty() {
            self.by_path
                .entry(entry.normalized_path.clone())
                .or_insert(slot);
        }
        self.by_identifier.insert(id, slot);
        self.entries.push(entry);
    }

    /// Root the index was built from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Look up a bundle by manifest identifier.
    pub fn get(&self, identifier: &str) -> Option<&BundleEntry> {
        self.by_identifier.get(identifier).map(|&i| &self.entries[i])
    }

    /// Look up a bundle by normalised directory path.
    pub fn get_by_path(&self, normalized_path: &str) -> Option<&BundleEntry> {
        self.by_path.get(normalized_path).map(|&i| &self.entries[i])
    }

    /// Identifier registered for a normalised directory path.
    pub fn identifier_for_path(&self, normalized_path: &str) -> Option<&str> {
        self.get_by_path(normalized_path).map(|e| e.identifier())
    }

    /// Iterate over bundles in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &BundleEntry> {
        self.entries.iter()
    }

    /// Bundles declaring the given capability, in discovery order.
    pub fn manifests_for<'a>(
        &'a self,
        capability: &'a str,
    ) -> impl Iterator<Item = &'a BundleEntry> + 'a {
        self.entries
            .iter()
            .filter(move |e| e.manifest.capability == capability)
    }

    /// Number of indexed bundles.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no bundles.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Walk `root` and index every well-formed manifest found.
pub fn build_index(root: &Path) -> BundleIndex {
    let mut index = BundleIndex::empty(root);

    if !root.is_dir() {
        debug!("Bundle root {:?} does not exist, index is empty", root);
        return index;
    }

    walk(root, root, &mut index);

    info!("Indexed {} extension bundles under {:?}", index.len(), root);
    index
}

fn walk(root: &Path, dir: &Path, index: &mut BundleIndex) {
    let manifest_path = dir.join(MANIFEST_FILE_NAME);
    if manifest_path.is_file() {
        match ExtensionManifest::from_file(&manifest_path) {
            Ok(manifest) => {
                let normalized_path = relative_bundle_path(root, dir).unwrap_or_default();
                debug!(
                    "Discovered extension: {} ({}) at {:?}",
                    manifest.identifier, manifest.capability, dir
                );
                index.insert(BundleEntry {
                    manifest,
                    dir: dir.to_path_buf(),
                    normalized_path,
                });
            }
            Err(e) => {
                warn!("Failed to load manifest from {:?}: {}", manifest_path, e);
            }
        }
    }

    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            warn!("Failed to read bundle directory {:?}: {}", dir, e);
            return;
        }
    };

    // Symlinked directories are not followed.
    let mut subdirs: Vec<PathBuf> = entries
        .flatten()
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|entry| entry.path())
        .collect();
    subdirs.sort();

    for subdir in subdirs {
        walk(root, &subdir, index);
    }
}
