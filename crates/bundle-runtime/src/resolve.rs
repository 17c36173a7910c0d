//! Reconciling registry identifiers against a bundle index.
//!
//! Match order:
//! 1. exact manifest identifier
//! 2. exact normalised directory path
//! 3. linear scan comparing each bundle's normalised path against the
//!    normalised requested identifier, first match wins
//!
//! The scan exists for legacy registry rows written with a different
//! separator or stray leading/trailing slashes. Its result follows index
//! iteration order.

use crate::discovery::{BundleEntry, BundleIndex};
use crate::error::{RuntimeError, RuntimeResult};
use crate::path::normalize_bundle_path;
use tracing::debug;

/// Resolve `requested_id` to a bundle, or `IdentifierNotFound`.
pub fn resolve_identifier<'a>(
    requested_id: &str,
    index: &'a BundleIndex,
) -> RuntimeResult<&'a BundleEntry> {
    if let Some(entry) = index.get(requested_id) {
        return Ok(entry);
    }

    if let Some(entry) = index.get_by_path(requested_id) {
        debug!(
            "Resolved '{}' by bundle path to '{}'",
            requested_id,
            entry.identifier()
        );
        return Ok(entry);
    }

    let wanted = normalize_bundle_path(requested_id);
    if !wanted.is_empty() {
        if let Some(entry) = index.iter().find(|e| e.normalized_path == wanted) {
            debug!(
                "Resolved '{}' by path scan to '{}'",
                requested_id,
                entry.identifier()
            );
            return Ok(entry);
        }
    }

    Err(RuntimeError::IdentifierNotFound(requested_id.to_string()))
}
