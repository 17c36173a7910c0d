//! Process-wide set of declared type names.
//!
//! Loading an entry file declares the type names it lists. A name, once
//! declared, stays declared for the lifetime of the runtime and is never
//! declared twice.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Handle to a declared type, as chosen by the class-name resolver.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeHandle {
    name: String,
}

impl TypeHandle {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Fully qualified type name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Default)]
struct Declared {
    order: Vec<String>,
    known: HashSet<String>,
}

/// Declared type names in declaration order.
#[derive(Debug, Default)]
pub struct TypeRuntime {
    declared: Mutex<Declared>,
}

impl TypeRuntime {
    /// Create an empty runtime.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Declared> {
        self.declared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check whether a type name has been declared.
    pub fn is_declared(&self, name: &str) -> bool {
        self.lock().known.contains(name)
    }

    /// Handle for a declared type name.
    pub fn handle(&self, name: &str) -> Option<TypeHandle> {
        self.is_declared(name).then(|| TypeHandle::new(name))
    }

    /// Declare `names` and return the ones that were not known before, in
    /// declaration order. The before/after snapshot and the declarations
    /// happen under one lock, so concurrent loads of different entry files
    /// never see each other's names in their result.
    pub fn declare_all<S: AsRef<str>>(&self, names: &[S]) -> Vec<String> {
        let mut declared = self.lock();
        let before = declared.order.len();

        for name in names {
            let name = name.as_ref();
            if declared.known.insert(name.to_string()) {
                declared.order.push(name.to_string());
            } else {
                debug!("Type '{}' is already declared, skipping", name);
            }
        }

        declared.order[before..].to_vec()
    }

    /// All declared names, in declaration order.
    pub fn snapshot(&self) -> Vec<String> {
        self.lock().order.clone()
    }

    /// Number of declared names.
    pub fn len(&self) -> usize {
        self.lock().order.len()
    }

    /// Whether nothing has been declared yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
