//! Factory registry for compiled-in extension types.
//!
//! Extension types are registered by fully qualified type name at init
//! time. Entry files only declare names; construction goes through the
//! factory registered under the resolved name.

use crate::capability::Extension;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Zero-argument constructor for an extension type.
pub type ExtensionFactory = Arc<dyn Fn() -> Result<Box<dyn Extension>, String> + Send + Sync>;

/// Registry of extension constructors by type name.
#[derive(Clone, Default)]
pub struct FactoryRegistry {
    factories: HashMap<String, ExtensionFactory>,
}

impl FactoryRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a constructor under `type_name`. A later registration under
    /// the same name replaces the earlier one.
    pub fn register<F>(&mut self, type_name: impl Into<String>, factory: F)
    where
        F: Fn() -> Result<Box<dyn Extension>, String> + Send + Sync + 'static,
    {
        let type_name = type_name.into();
        debug!("Registered extension factory: {}", type_name);
        self.factories.insert(type_name, Arc::new(factory));
    }

    /// Register a `Default`-constructible type under `type_name`.
    pub fn register_default<T>(&mut self, type_name: impl Into<String>)
    where
        T: Extension + Default + 'static,
    {
        self.register(type_name, || Ok(Box::new(T::default()) as Box<dyn Extension>));
    }

    /// Get the constructor for a type name.
    pub fn get(&self, type_name: &str) -> Option<&ExtensionFactory> {
        self.factories.get(type_name)
    }

    /// Check if a constructor is registered for a type name.
    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    /// All registered type names (sorted).
    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered constructors.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl std::fmt::Debug for FactoryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactoryRegistry")
            .field("types", &self.type_names())
            .finish()
    }
}
