//! Instantiating and configuring a resolved extension type.

use crate::capability::Extension;
use crate::error::{ExtensionError, ExtensionResult};
use crate::factory::FactoryRegistry;
use crate::types::TypeHandle;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// Decode attempts before giving up on an encoded string.
const MAX_DECODE_ATTEMPTS: usize = 2;

/// Decode persisted configuration.
///
/// Admin tooling sometimes stores the settings JSON-encoded twice, so a
/// decoded JSON string is decoded again, up to two attempts in total.
/// Returns `Some` only for a non-empty object.
pub fn decode_config(raw: &str) -> ExtensionResult<Option<Map<String, Value>>> {
    let mut value: Value = serde_json::from_str(raw)?;

    for _ in 1..MAX_DECODE_ATTEMPTS {
        match value {
            Value::String(inner) => value = serde_json::from_str(&inner)?,
            _ => break,
        }
    }

    match value {
        Value::Object(map) if !map.is_empty() => Ok(Some(map)),
        _ => Ok(None),
    }
}

/// Constructs extension instances from the factory registry.
#[derive(Debug, Clone)]
pub struct ExtensionActivator {
    factories: Arc<FactoryRegistry>,
}

impl ExtensionActivator {
    pub fn new(factories: Arc<FactoryRegistry>) -> Self {
        Self { factories }
    }

    /// Construct `handle` and apply `serialized_config` if the instance
    /// accepts configuration.
    ///
    /// Only construction can fail. Configuration that cannot be decoded or
    /// is rejected is logged and the instance keeps its defaults.
    pub fn activate(
        &self,
        handle: &TypeHandle,
        serialized_config: Option<&str>,
    ) -> ExtensionResult<Box<dyn Extension>> {
        let factory = self.factories.get(handle.name()).ok_or_else(|| {
            ExtensionError::ActivationConstruction {
                type_name: handle.name().to_string(),
                message: "no factory registered for type".to_string(),
            }
        })?;

        let mut instance = factory().map_err(|message| ExtensionError::ActivationConstruction {
            type_name: handle.name().to_string(),
            message,
        })?;

        let raw = serialized_config.map(str::trim).unwrap_or_default();
        if raw.is_empty() {
            return Ok(instance);
        }

        if let Some(target) = instance.as_configurable() {
            match decode_config(raw) {
                Ok(Some(config)) => {
                    if let Err(e) = target.configure(&config) {
                        warn!("'{}' rejected its configuration: {}", handle.name(), e);
                    }
                }
                Ok(None) => {
                    debug!("Configuration for '{}' is not a non-empty object", handle.name());
                }
                Err(e) => {
                    warn!("Ignoring configuration for '{}': {}", handle.name(), e);
                }
            }
        }

        Ok(instance)
    }
}
