//! Entry-point loading.
//!
//! An entry file is a small TOML document listing the type names a bundle
//! declares, in declaration order:
//!
//! ```toml
//! declares = ["Vendor\\Captcha", "Vendor\\CaptchaHelper"]
//! ```
//!
//! Each entry file is physically read at most once per loader. Loads of the
//! same path serialise on a per-path lock held across the read and the
//! declaration snapshot; loads of different paths proceed independently.

use crate::error::{ExtensionError, ExtensionResult};
use crate::types::TypeRuntime;
use bundle_runtime::BundleEntry;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

/// Parsed entry file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryFile {
    /// Type names declared by this file, in declaration order.
    #[serde(default)]
    pub declares: Vec<String>,
}

impl EntryFile {
    /// Read and parse an entry file.
    pub fn from_file(path: &Path) -> ExtensionResult<Self> {
        let unreadable = |message: String| ExtensionError::EntryFileUnreadable {
            path: path.to_path_buf(),
            message,
        };

        let content = std::fs::read_to_string(path).map_err(|e| unreadable(e.to_string()))?;
        toml::from_str(&content).map_err(|e| unreadable(e.to_string()))
    }
}

/// Result of a successful load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadOutcome {
    /// Type names this entry file introduced, in declaration order.
    /// Empty when the canonical type was already declared.
    pub newly_declared: Vec<String>,
}

type LoadSlot = Arc<Mutex<Option<Vec<String>>>>;

/// Loads bundle entry files into a [`TypeRuntime`].
#[derive(Debug)]
pub struct EntryPointLoader {
    types: Arc<TypeRuntime>,
    slots: Mutex<HashMap<PathBuf, LoadSlot>>,
    physical_loads: AtomicUsize,
}

impl EntryPointLoader {
    /// Create a loader declaring into `types`.
    pub fn new(types: Arc<TypeRuntime>) -> Self {
        Self {
            types,
            slots: Mutex::new(HashMap::new()),
            physical_loads: AtomicUsize::new(0),
        }
    }

    /// The type runtime this loader declares into.
    pub fn types(&self) -> &Arc<TypeRuntime> {
        &self.types
    }

    fn slot(&self, key: &Path) -> LoadSlot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(key.to_path_buf()).or_default())
    }

    fn slot_key(path: &Path) -> PathBuf {
        std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
    }

    /// Load a bundle's entry file.
    ///
    /// A no-op success when the bundle's canonical type is already declared.
    /// When the file was loaded earlier but its canonical type is not
    /// declared, the names it introduced on that first load are returned
    /// again without touching the file.
    pub fn load(&self, bundle: &BundleEntry) -> ExtensionResult<LoadOutcome> {
        let canonical = bundle.manifest.canonical_type_name();
        if self.types.is_declared(&canonical) {
            debug!("Type '{}' already declared, skipping load", canonical);
            return Ok(LoadOutcome::default());
        }

        let path = bundle.entry_file_path();
        let slot = self.slot(&Self::slot_key(&path));
        let mut loaded = slot.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(names) = loaded.as_ref() {
            debug!("Entry file {:?} already loaded", path);
            return Ok(LoadOutcome {
                newly_declared: names.clone(),
            });
        }

        let entry = EntryFile::from_file(&path)?;
        let newly_declared = self.types.declare_all(&entry.declares);
        self.physical_loads.fetch_add(1, Ordering::Relaxed);

        info!(
            "Loaded entry file for '{}': {} new type(s)",
            bundle.identifier(),
            newly_declared.len()
        );

        *loaded = Some(newly_declared.clone());
        Ok(LoadOutcome { newly_declared })
    }

    /// Whether the entry file at `path` has been physically loaded.
    pub fn is_loaded(&self, path: &Path) -> bool {
        let key = Self::slot_key(path);
        let slot = {
            let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.get(&key).cloned()
        };
        match slot {
            Some(slot) => {
                let loaded = slot.lock().unwrap_or_else(PoisonError::into_inner);
                loaded.is_some()
            }
            None => false,
        }
    }

    /// Number of entry files physically read so far.
    pub fn loaded_count(&self) -> usize {
        self.physical_loads.load(Ordering::Relaxed)
    }
}
