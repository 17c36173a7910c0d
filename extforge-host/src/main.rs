//! # extforge
//!
//! Command-line front end for the extforge host.
//!
//! ```text
//! extforge [--config <path>] <command>
//!
//! Commands:
//!   single <capability>                          Print the active extension
//!   all <capability>                             Print every active extension
//!   index                                        Print the bundle index
//!   install <identifier> <capability> [config]   Install and enable a bundle
//! ```
//!
//! ## Configuration
//!
//! The host reads configuration from `$XDG_CONFIG_HOME/extforge/config.toml`
//! unless `--config` is given. `RUST_LOG` overrides the configured log level.
//!
//! ## Running
//!
//! ```bash
//! # Which CAPTCHA is active?
//! cargo run --bin extforge -- single verification
//!
//! # With debug logging
//! RUST_LOG=debug cargo run --bin extforge -- all thirdparty_login
//! ```

use anyhow::{bail, Context, Result};
use extension_api::{CapabilityTag, ExtensionRuntime, FactoryRegistry};
use extforge_host::{
    open_registry, ActivationRecord, CapabilityQuery, Config, ResolvedExtension,
    SqliteActivationRegistry,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: extforge [--config <path>] <single|all|index|install> [args...]";

fn main() -> Result<()> {
    let mut args: Vec<String> = std::env::args().skip(1).collect();

    let config_path = match args.iter().position(|a| a == "--config") {
        Some(pos) => {
            if pos + 1 >= args.len() {
                bail!("--config requires a path\n{}", USAGE);
            }
            let path = PathBuf::from(args.remove(pos + 1));
            args.remove(pos);
            Some(path)
        }
        None => None,
    };

    let (config, config_error) = match &config_path {
        Some(path) => (Config::load(path)?, None),
        None => match Config::load_default() {
            Ok(cfg) => (cfg, None),
            Err(e) => (Config::default(), Some(e)),
        },
    };

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.host.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting extforge v{}", env!("CARGO_PKG_VERSION"));
    if let Some(e) = config_error {
        info!("Failed to load config, using defaults: {:#}", e);
    }

    let Some(command) = args.first().map(String::as_str) else {
        bail!(USAGE);
    };

    match (command, &args[1..]) {
        ("single", [capability]) => {
            let query = build_query(&config)?;
            match query.get_single(capability) {
                Some(resolved) => print_resolved(&resolved),
                None => println!("no active extension for '{}'", capability),
            }
        }
        ("all", [capability]) => {
            let query = build_query(&config)?;
            let resolved = query.get_all(capability);
            if resolved.is_empty() {
                println!("no active extensions for '{}'", capability);
            }
            for extension in &resolved {
                print_resolved(extension);
            }
        }
        ("index", []) => {
            let root = config.bundle_root()?;
            let index = bundle_runtime::build_index(&root);
            println!("{} bundle(s) under {}", index.len(), root.display());
            for entry in index.iter() {
                println!(
                    "{:<24} {:<18} {:<32} {}{}",
                    entry.identifier(),
                    entry.manifest.capability,
                    entry.normalized_path,
                    entry.manifest.canonical_type_name(),
                    if entry.manifest.is_embedded_active() {
                        " (embedded: active)"
                    } else {
                        ""
                    }
                );
            }
        }
        ("install", [identifier, capability, rest @ ..]) if rest.len() <= 1 => {
            let path = config.registry_path()?;
            let registry = SqliteActivationRegistry::open_at(&path)
                .with_context(|| format!("Failed to open registry at {}", path.display()))?;

            let mut record = ActivationRecord::installed(identifier.as_str(), capability.as_str());
            if let Some(serialized) = rest.first() {
                record = record.with_config(serialized.as_str());
            }
            registry.upsert_record(&record)?;
            println!("installed '{}' for '{}'", identifier, capability);
        }
        _ => bail!(USAGE),
    }

    Ok(())
}

fn build_query(config: &Config) -> Result<CapabilityQuery> {
    let mut factories = FactoryRegistry::new();
    extension_dummy::register(&mut factories);
    info!("Registered {} extension type(s)", factories.len());

    let registry = open_registry(&config.registry_path()?);
    let runtime = Arc::new(ExtensionRuntime::new(factories));

    Ok(CapabilityQuery::new(registry, config.bundle_root()?, runtime))
}

fn print_resolved(resolved: &ResolvedExtension) {
    println!(
        "{} ({}) as {} [{:?}]",
        resolved.display_name(),
        resolved.identifier(),
        resolved.type_name,
        resolved.source
    );

    let tag = CapabilityTag::parse(&resolved.manifest.capability);
    if !tag.is_offered_by(resolved.instance.as_ref()) {
        println!("  offers no typed '{}' operations", tag);
    }

    if let Some(verification) = resolved.instance.as_verification() {
        if let Some(widget) = verification.widget() {
            println!("  widget: {}", widget);
        }
    }
    if let Some(login) = resolved.instance.as_login_provider() {
        if let Some(button) = login.login_button() {
            println!("  login button: {}", button);
        }
    }
}
