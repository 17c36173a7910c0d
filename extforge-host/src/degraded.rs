//! Filesystem-only resolution.
//!
//! Used when the activation registry cannot be queried or has no eligible
//! rows. Eligibility comes from the manifest itself: `installed = true` and
//! `status = "enabled"`. No persisted configuration exists in this mode.

use crate::query::{resolve_entry, ResolutionSource, ResolvedExtension};
use bundle_runtime::{BundleEntry, BundleIndex};
use extension_api::ExtensionRuntime;
use tracing::{info, warn};

pub struct DegradedModeResolver<'a> {
    runtime: &'a ExtensionRuntime,
}

impl<'a> DegradedModeResolver<'a> {
    pub fn new(runtime: &'a ExtensionRuntime) -> Self {
        Self { runtime }
    }

    /// First eligible bundle that activates, in index order.
    pub fn resolve_first(
        &self,
        index: &BundleIndex,
        capability: &str,
    ) -> Option<ResolvedExtension> {
        for entry in Self::eligible(index, capability) {
            if let Some(resolved) = self.resolve(entry, capability) {
                info!(
                    "Resolved '{}' for '{}' from manifest (degraded mode)",
                    resolved.identifier(),
                    capability
                );
                return Some(resolved);
            }
        }

        info!("No active extension for '{}'", capability);
        None
    }

    /// Every eligible bundle that activates, in index order.
    pub fn resolve_all(&self, index: &BundleIndex, capability: &str) -> Vec<ResolvedExtension> {
        let resolved: Vec<ResolvedExtension> = Self::eligible(index, capability)
            .filter_map(|entry| self.resolve(entry, capability))
            .collect();

        info!(
            "Resolved {} extension(s) for '{}' from manifests (degraded mode)",
            resolved.len(),
            capability
        );
        resolved
    }

    fn eligible<'i>(
        index: &'i BundleIndex,
        capability: &'i str,
    ) -> impl Iterator<Item = &'i BundleEntry> + 'i {
        index
            .manifests_for(capability)
            .filter(|entry| entry.manifest.is_embedded_active())
    }

    fn resolve(&self, entry: &BundleEntry, capability: &str) -> Option<ResolvedExtension> {
        match resolve_entry(self.runtime, entry, None, ResolutionSource::Fallback) {
            Ok(resolved) => Some(resolved),
            Err(e) => {
                warn!(
                    "Skipping bundle '{}' for '{}': {}",
                    entry.identifier(),
                    capability,
                    e
                );
                None
            }
        }
    }
}
