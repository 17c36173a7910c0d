//! # extension-api
//!
//! Turns a discovered bundle into a live extension instance.
//!
//! This crate provides:
//!
//! - Typed capability interfaces (`VerificationCapability`,
//!   `LoginProviderCapability`) in place of method probing
//! - A factory registry of compiled-in extension types, populated at init
//! - The process-wide type runtime that entry files declare names into
//! - `EntryPointLoader`, loading each entry file at most once per process
//! - `ClassNameResolver`, picking the bundle's implementation type
//! - `ExtensionActivator`, constructing and configuring the instance
//!
//! `ExtensionRuntime` ties these together into a single
//! load → resolve → activate chain.

pub mod activator;
pub mod capability;
pub mod error;
pub mod factory;
pub mod loader;
pub mod resolver;
pub mod runtime;
pub mod types;

pub use activator::{decode_config, ExtensionActivator};
pub use capability::{
    CapabilityTag, Configurable, Extension, LoginProviderCapability, VerificationCapability,
};
pub use error::{ExtensionError, ExtensionResult};
pub use factory::{ExtensionFactory, FactoryRegistry};
pub use loader::{EntryFile, EntryPointLoader, LoadOutcome};
pub use resolver::ClassNameResolver;
pub use runtime::ExtensionRuntime;
pub use types::{TypeHandle, TypeRuntime};
