//! Capability lookups.
//!
//! `CapabilityQuery` answers "give me the active extension for X" and "give
//! me every active extension for X". Two sources are consulted in order:
//!
//! 1. **Primary**: enabled and installed rows from the activation registry
//! 2. **Fallback**: bundles whose manifests mark themselves installed and
//!    enabled, used when the registry is unreachable or has nothing
//!
//! Every failure is contained to the one extension being resolved and
//! logged; callers only ever see "present" or "absent".

use crate::activation::{ActivationRecord, ActivationRegistry};
use crate::degraded::DegradedModeResolver;
use anyhow::{bail, Result};
use bundle_runtime::{build_index, resolve_identifier, BundleEntry, BundleIndex, ExtensionManifest};
use extension_api::{Extension, ExtensionResult, ExtensionRuntime};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where a resolved extension came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    /// An activation registry row.
    Primary,
    /// Manifest-embedded status (degraded mode).
    Fallback,
}

/// One successful resolution, scoped to a single query.
pub struct ResolvedExtension {
    pub manifest: ExtensionManifest,
    pub type_name: String,
    pub instance: Box<dyn Extension>,
    pub source: ResolutionSource,
}

impl ResolvedExtension {
    pub fn identifier(&self) -> &str {
        &self.manifest.identifier
    }

    pub fn display_name(&self) -> &str {
        self.manifest.name()
    }
}

impl std::fmt::Debug for ResolvedExtension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedExtension")
            .field("identifier", &self.manifest.identifier)
            .field("type_name", &self.type_name)
            .field("source", &self.source)
            .finish()
    }
}

/// Run the load → resolve → activate chain for one bundle.
pub(crate) fn resolve_entry(
    runtime: &ExtensionRuntime,
    entry: &BundleEntry,
    serialized_config: Option<&str>,
    source: ResolutionSource,
) -> ExtensionResult<ResolvedExtension> {
    let handle = runtime.resolve(entry)?;
    let instance = runtime.activate(&handle, serialized_config)?;

    Ok(ResolvedExtension {
        manifest: entry.manifest.clone(),
        type_name: handle.name().to_string(),
        instance,
        source,
    })
}

/// Capability lookups over a bundle tree and an activation registry.
pub struct CapabilityQuery {
    registry: Arc<dyn ActivationRegistry>,
    bundle_root: PathBuf,
    runtime: Arc<ExtensionRuntime>,
}

impl CapabilityQuery {
    pub fn new(
        registry: Arc<dyn ActivationRegistry>,
        bundle_root: impl Into<PathBuf>,
        runtime: Arc<ExtensionRuntime>,
    ) -> Self {
        Self {
            registry,
            bundle_root: bundle_root.into(),
            runtime,
        }
    }

    pub fn bundle_root(&self) -> &Path {
        &self.bundle_root
    }

    pub fn runtime(&self) -> &ExtensionRuntime {
        &self.runtime
    }

    /// Index the bundle tree as it is right now.
    pub fn index(&self) -> BundleIndex {
        build_index(&self.bundle_root)
    }

    /// The active extension for `capability`, if any.
    ///
    /// Only the first eligible registry row is tried. If the registry is
    /// unavailable, has no eligible row, or that row fails to resolve, one
    /// degraded-mode attempt is made.
    pub fn get_single(&self, capability: &str) -> Option<ResolvedExtension> {
        let index = self.index();

        if let Some(record) = self.primary_records(capability).into_iter().flatten().next() {
            match self.resolve_record(&index, capability, &record) {
                Ok(resolved) => {
                    info!(
                        "Resolved '{}' for '{}' from registry",
                        resolved.identifier(),
                        capability
                    );
                    return Some(resolved);
                }
                Err(e) => warn!(
                    "Registry record '{}' for '{}' failed, trying manifests: {:#}",
                    record.identifier, capability, e
                ),
            }
        }

        DegradedModeResolver::new(&self.runtime).resolve_first(&index, capability)
    }

    /// Every active extension for `capability`, in registry order.
    ///
    /// A record that fails to resolve is logged and omitted. Manifests are
    /// consulted only when the registry is unavailable or has no eligible
    /// rows.
    pub fn get_all(&self, capability: &str) -> Vec<ResolvedExtension> {
        let index = self.index();

        let records = match self.primary_records(capability) {
            Some(records) if !records.is_empty() => records,
            _ => return DegradedModeResolver::new(&self.runtime).resolve_all(&index, capability),
        };

        let total = records.len();
        let resolved: Vec<ResolvedExtension> = records
            .iter()
            .filter_map(|record| match self.resolve_record(&index, capability, record) {
                Ok(resolved) => Some(resolved),
                Err(e) => {
                    warn!(
                        "Skipping registry record '{}' for '{}': {:#}",
                        record.identifier, capability, e
                    );
                    None
                }
            })
            .collect();

        info!(
            "Resolved {}/{} registry record(s) for '{}'",
            resolved.len(),
            total,
            capability
        );
        resolved
    }

    /// Eligible registry rows, or `None` when the registry is unavailable.
    fn primary_records(&self, capability: &str) -> Option<Vec<ActivationRecord>> {
        match self.registry.enabled_records(capability) {
            Ok(records) => {
                debug!(
                    "Registry returned {} record(s) for '{}'",
                    records.len(),
                    capability
                );
                Some(records)
            }
            Err(e) => {
                warn!("{}; resolving '{}' from manifests", e, capability);
                None
            }
        }
    }

    fn resolve_record(
        &self,
        index: &BundleIndex,
        capability: &str,
        record: &ActivationRecord,
    ) -> Result<ResolvedExtension> {
        let entry = resolve_identifier(&record.identifier, index)?;

        if entry.manifest.capability != capability {
            bail!(
                "bundle '{}' implements '{}', not '{}'",
                entry.identifier(),
                entry.manifest.capability,
                capability
            );
        }

        Ok(resolve_entry(
            &self.runtime,
            entry,
            record.serialized_config.as_deref(),
            ResolutionSource::Primary,
        )?)
    }
}

impl std::fmt::Debug for CapabilityQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityQuery")
            .field("bundle_root", &self.bundle_root)
            .field("runtime", &self.runtime)
            .finish()
    }
}
