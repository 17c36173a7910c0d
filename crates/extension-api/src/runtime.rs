//! The load → resolve → activate chain for one bundle.

use crate::activator::ExtensionActivator;
use crate::capability::Extension;
use crate::error::ExtensionResult;
use crate::factory::FactoryRegistry;
use crate::loader::EntryPointLoader;
use crate::resolver::ClassNameResolver;
use crate::types::{TypeHandle, TypeRuntime};
use bundle_runtime::BundleEntry;
use std::sync::Arc;
use tracing::debug;

/// Process-wide extension state: compiled-in factories, declared types
/// and the load-once bookkeeping.
#[derive(Debug)]
pub struct ExtensionRuntime {
    loader: EntryPointLoader,
    resolver: ClassNameResolver,
    activator: ExtensionActivator,
}

impl ExtensionRuntime {
    /// Create a runtime over a populated factory registry.
    pub fn new(factories: FactoryRegistry) -> Self {
        let types = Arc::new(TypeRuntime::new());
        Self {
            loader: EntryPointLoader::new(Arc::clone(&types)),
            resolver: ClassNameResolver::new(types),
            activator: ExtensionActivator::new(Arc::new(factories)),
        }
    }

    pub fn loader(&self) -> &EntryPointLoader {
        &self.loader
    }

    pub fn types(&self) -> &TypeRuntime {
        self.loader.types()
    }

    /// Load the bundle's entry file and pick its implementation type.
    pub fn resolve(&self, bundle: &BundleEntry) -> ExtensionResult<TypeHandle> {
        let outcome = self.loader.load(bundle)?;
        self.resolver
            .resolve_type(&bundle.manifest, &outcome.newly_declared)
    }

    /// Construct and configure a resolved type.
    pub fn activate(
        &self,
        handle: &TypeHandle,
        serialized_config: Option<&str>,
    ) -> ExtensionResult<Box<dyn Extension>> {
        self.activator.activate(handle, serialized_config)
    }

    /// Resolve and activate `bundle` with optional persisted configuration.
    pub fn instantiate(
        &self,
        bundle: &BundleEntry,
        serialized_config: Option<&str>,
    ) -> ExtensionResult<Box<dyn Extension>> {
        let handle = self.resolve(bundle)?;
        debug!(
            "Activating '{}' as '{}'",
            bundle.identifier(),
            handle.name()
        );
        self.activate(&handle, serialized_config)
    }
}
