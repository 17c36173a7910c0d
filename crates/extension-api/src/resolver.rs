//! Choosing a bundle's implementation type.
//!
//! Primary rule: the canonical name (namespace + entry file base name), if
//! declared. Secondary rule, only when the primary fails: the last of the
//! entry file's newly declared names that starts with the manifest
//! namespace. Bundles declaring several prefixed types therefore resolve to
//! whichever comes last in the file; one exported type per bundle avoids
//! the ambiguity.

use crate::error::{ExtensionError, ExtensionResult};
use crate::types::{TypeHandle, TypeRuntime};
use bundle_runtime::ExtensionManifest;
use std::sync::Arc;
use tracing::debug;

/// Resolves implementation types against a [`TypeRuntime`].
#[derive(Debug, Clone)]
pub struct ClassNameResolver {
    types: Arc<TypeRuntime>,
}

impl ClassNameResolver {
    pub fn new(types: Arc<TypeRuntime>) -> Self {
        Self { types }
    }

    /// Resolve the implementation type for `manifest`.
    pub fn resolve_type(
        &self,
        manifest: &ExtensionManifest,
        newly_declared: &[String],
    ) -> ExtensionResult<TypeHandle> {
        let canonical = manifest.canonical_type_name();
        if let Some(handle) = self.types.handle(&canonical) {
            return Ok(handle);
        }

        let fallback = newly_declared
            .iter()
            .rev()
            .find(|name| name.starts_with(&manifest.namespace));

        match fallback {
            Some(name) if self.types.is_declared(name) => {
                debug!(
                    "'{}' not declared for '{}', using '{}'",
                    canonical, manifest.identifier, name
                );
                Ok(TypeHandle::new(name.as_str()))
            }
            _ => Err(ExtensionError::TypeResolution(manifest.identifier.clone())),
        }
    }
}
