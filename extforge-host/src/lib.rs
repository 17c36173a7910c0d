//! extforge host library
//!
//! Reconciles the activation registry with the bundle tree and answers
//! capability queries. Exported for the `extforge` binary and for tests.

pub mod activation;
pub mod config;
pub mod degraded;
pub mod query;

pub use activation::{
    open_registry, ActivationRecord, ActivationRegistry, RegistryUnavailable,
    SqliteActivationRegistry, UnavailableRegistry,
};
pub use config::Config;
pub use degraded::DegradedModeResolver;
pub use query::{CapabilityQuery, ResolutionSource, ResolvedExtension};
