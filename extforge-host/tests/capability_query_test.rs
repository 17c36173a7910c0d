//! Integration tests for capability queries.
//!
//! These tests cover:
//! - Registry-driven resolution for single and multi-result lookups
//! - Identifier reconciliation by bundle path
//! - Containment of per-extension failures
//! - Degraded mode when the registry is unavailable or empty


use fixtures::{create_query, write_bundle, TestBundle};

use extforge_host::{
    ActivationRecord, ResolutionSource, SqliteActivationRegistry, UnavailableRegistry,
};
use std::sync::Arc;
use tempfile::TempDir;

fn registry_with(records: &[ActivationRecord]) -> Arc<SqliteActivationRegistry> {
    let registry = SqliteActivationRegistry::open_in_memory().unwrap();
    for record in records {
        registry.upsert_record(record).unwrap();
    }
    Arc::new(registry)
}

fn captcha_bundle<'a>(rel: &'a str, id: &'a str, declares: &'a [&'a str]) -> TestBundle<'a> {
    let entry_file = match declares.first() {
        Some(name) if name.ends_with("Image") => "Image.ext",
        Some(name) if name.ends_with("Math") => "Math.ext",
        _ => "Simple.ext",
    };
    TestBundle::new(rel, id, "verification").entry("Captcha\\", entry_file, declares)
}

// ==============================================================================
// Registry Resolution
// ==============================================================================

#[test]
fn test_get_all_resolves_canonical_and_fallback_types() {
    let temp_dir = TempDir::new().unwrap();
    write_bundle(
        temp_dir.path(),
        &TestBundle::new("login/a", "vendor_a", "thirdparty_login").entry(
            "Vendor\\",
            "A.ext",
            &["Vendor\\A"],
        ),
    );
    write_bundle(
        temp_dir.path(),
        &TestBundle::new("login/b", "vendor_b", "thirdparty_login").entry(
            "Vendor\\",
            "B.ext",
            &["Vendor\\BImpl"],
        ),
    );

    let registry = registry_with(&[
        ActivationRecord::installed("vendor_a", "thirdparty_login"),
        ActivationRecord::installed("vendor_b", "thirdparty_login"),
    ]);
    let query = create_query(registry, temp_dir.path());

    let resolved = query.get_all("thirdparty_login");

    assert_eq!(resolved.len(), 2);
    assert_eq!(resolved[0].identifier(), "vendor_a");
    assert_eq!(resolved[0].type_name, "Vendor\\A");
    assert_eq!(resolved[1].identifier(), "vendor_b");
    assert_eq!(resolved[1].type_name, "Vendor\\BImpl");
    for extension in &resolved {
        assert_eq!(extension.source, ResolutionSource::Primary);
        assert!(extension.instance.as_login_provider().is_some());
        assert_eq!(
            extension.display_name(),
            format!("Test Extension {}", extension.identifier())
        );
    }
}

#[test]
fn test_get_single_matches_registry_path_identifier() {
    let temp_dir = TempDir::new().unwrap();
    write_bundle(
        temp_dir.path(),
        &captcha_bundle("verification/basic/simple", "simple_captcha", &["Captcha\\Simple"]),
    );

    let registry = registry_with(&[ActivationRecord::installed(
        "verification/basic/simple",
        "verification",
    )]);
    let query = create_query(registry, temp_dir.path());

    let resolved = query.get_single("verification").unwrap();

    assert_eq!(resolved.identifier(), "simple_captcha");
    assert_eq!(resolved.type_name, "Captcha\\Simple");
    assert_eq!(resolved.source, ResolutionSource::Primary);
}

#[test]
fn test_get_all_omits_only_the_broken_record() {
    let temp_dir = TempDir::new().unwrap();
    write_bundle(
        temp_dir.path(),
        &captcha_bundle("simple", "simple", &["Captcha\\Simple"]),
    );
    let broken = write_bundle(
        temp_dir.path(),
        &captcha_bundle("image", "image", &["Captcha\\Image"]),
    );
    write_bundle(
        temp_dir.path(),
        &captcha_bundle("math", "math", &["Captcha\\Math"]),
    );
    std::fs::remove_file(broken.join("Image.ext")).unwrap();

    let registry = registry_with(&[
        ActivationRecord::installed("math", "verification"),
        ActivationRecord::installed("image", "verification"),
        ActivationRecord::installed("simple", "verification"),
    ]);
    let query = create_query(registry, temp_dir.path());

    let ids: Vec<String> = query
        .get_all("verification")
        .iter()
        .map(|r| r.identifier().to_string())
        .collect();

    assert_eq!(ids, vec!["math", "simple"]);
}

#[test]
fn test_get_all_skips_unknown_and_mismatched_records() {
    let temp_dir = TempDir::new().unwrap();
    write_bundle(
        temp_dir.path(),
        &captcha_bundle("simple", "simple", &["Captcha\\Simple"]),
    );
    write_bundle(
        temp_dir.path(),
        &TestBundle::new("login/a", "vendor_a", "thirdparty_login").entry(
            "Vendor\\",
            "A.ext",
            &["Vendor\\A"],
        ),
    );

    let registry = registry_with(&[
        ActivationRecord::installed("gone", "verification"),
        ActivationRecord::installed("vendor_a", "verification"),
        ActivationRecord::installed("simple", "verification"),
    ]);
    let query = create_query(registry, temp_dir.path());

    let resolved = query.get_all("verification");

    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].identifier(), "simple");
}

#[test]
fn test_double_encoded_registry_config_is_applied() {
    let temp_dir = TempDir::new().unwrap();
    write_bundle(
        temp_dir.path(),
        &captcha_bundle("simple", "simple", &["Captcha\\Simple"]),
    );

    let inner = serde_json::json!({ "challenge": "abcd" }).to_string();
    let double_encoded = serde_json::to_string(&inner).unwrap();
    let registry = registry_with(&[
        ActivationRecord::installed("simple", "verification").with_config(double_encoded)
    ]);
    let query = create_query(registry, temp_dir.path());

    let resolved = query.get_single("verification").unwrap();
    let captcha = resolved.instance.as_verification().unwrap();

    assert_eq!(captcha.generate().as_deref(), Some("abcd"));
    assert_eq!(captcha.verify("abcd", ""), Some(true));
}

#[test]
fn test_rejected_config_keeps_defaults() {
    let temp_dir = TempDir::new().unwrap();
    write_bundle(
        temp_dir.path(),
        &captcha_bundle("simple", "simple", &["Captcha\\Simple"]),
    );

    let registry = registry_with(&[
        ActivationRecord::installed("simple", "verification").with_config(r#"{"challenge": 5}"#)
    ]);
    let query = create_query(registry, temp_dir.path());

    let resolved = query.get_single("verification").unwrap();
    assert_eq!(
        resolved.instance.as_verification().unwrap().generate().as_deref(),
        Some("1234")
    );
}

#[test]
fn test_repeated_queries_load_each_entry_file_once() {
    let temp_dir = TempDir::new().unwrap();
    write_bundle(
        temp_dir.path(),
        &TestBundle::new("login/b", "vendor_b", "thirdparty_login").entry(
            "Vendor\\",
            "B.ext",
            &["Vendor\\BImpl"],
        ),
    );

    let registry = registry_with(&[ActivationRecord::installed("vendor_b", "thirdparty_login")]);
    let query = create_query(registry, temp_dir.path());

    for _ in 0..3 {
        let resolved = query.get_all("thirdparty_login");
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].type_name, "Vendor\\BImpl");
    }

    assert_eq!(query.runtime().loader().loaded_count(), 1);
}

// ==============================================================================
// Absent Capabilities
// ==============================================================================

#[test]
fn test_get_single_returns_none_without_any_match() {
    let temp_dir = TempDir::new().unwrap();
    write_bundle(
        temp_dir.path(),
        &captcha_bundle("simple", "simple", &["Captcha\\Simple"]),
    );

    let registry = registry_with(&[]);
    let query = create_query(registry, temp_dir.path());

    assert!(query.get_single("verification").is_none());
    assert!(query.get_single("payment").is_none());
    assert!(query.get_all("verification").is_empty());
}

#[test]
fn test_missing_bundle_tree_is_no_extensions() {
    let temp_dir = TempDir::new().unwrap();
    let registry = registry_with(&[ActivationRecord::installed("simple", "verification")]);
    let query = create_query(registry, &temp_dir.path().join("missing"));

    assert!(query.get_single("verification").is_none());
    assert!(query.get_all("verification").is_empty());
}

// ==============================================================================
// Degraded Mode
// ==============================================================================

#[test]
fn test_unavailable_registry_uses_embedded_status() {
    let temp_dir = TempDir::new().unwrap();
    write_bundle(
        temp_dir.path(),
        &captcha_bundle("a-simple", "simple", &["Captcha\\Simple"]).embedded_active(),
    );
    write_bundle(
        temp_dir.path(),
        &captcha_bundle("b-image", "image", &["Captcha\\Image"]),
    );
    write_bundle(
        temp_dir.path(),
        &captcha_bundle("c-math", "math", &["Captcha\\Math"]).embedded_active(),
    );

    let query = create_query(
        Arc::new(UnavailableRegistry::new("database is locked")),
        temp_dir.path(),
    );

    let single = query.get_single("verification").unwrap();
    assert_eq!(single.identifier(), "simple");
    assert_eq!(single.source, ResolutionSource::Fallback);

    let ids: Vec<String> = query
        .get_all("verification")
        .iter()
        .map(|r| r.identifier().to_string())
        .collect();
    assert_eq!(ids, vec!["simple", "math"]);
}

#[test]
fn test_empty_registry_uses_embedded_status() {
    let temp_dir = TempDir::new().unwrap();
    write_bundle(
        temp_dir.path(),
        &TestBundle::new("login/a", "vendor_a", "thirdparty_login")
            .entry("Vendor\\", "A.ext", &["Vendor\\A"])
            .embedded_active(),
    );

    let query = create_query(registry_with(&[]), temp_dir.path());

    let resolved = query.get_all("thirdparty_login");
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].source, ResolutionSource::Fallback);
}

#[test]
fn test_get_single_falls_back_when_first_record_fails() {
    let temp_dir = TempDir::new().unwrap();
    let broken = write_bundle(
        temp_dir.path(),
        &captcha_bundle("image", "image", &["Captcha\\Image"]),
    );
    write_bundle(
        temp_dir.path(),
        &captcha_bundle("math", "math", &["Captcha\\Math"]).embedded_active(),
    );
    std::fs::remove_file(broken.join("Image.ext")).unwrap();

    let registry = registry_with(&[ActivationRecord::installed("image", "verification")]);
    let query = create_query(registry, temp_dir.path());

    let resolved = query.get_single("verification").unwrap();
    assert_eq!(resolved.identifier(), "math");
    assert_eq!(resolved.source, ResolutionSource::Fallback);
}

#[test]
fn test_degraded_get_single_skips_bundles_that_fail() {
    let temp_dir = TempDir::new().unwrap();
    write_bundle(
        temp_dir.path(),
        &captcha_bundle("a", "unregistered", &["Captcha\\Nobody"]).embedded_active(),
    );
    write_bundle(
        temp_dir.path(),
        &captcha_bundle("b", "math", &["Captcha\\Math"]).embedded_active(),
    );

    let query = create_query(
        Arc::new(UnavailableRegistry::new("offline")),
        temp_dir.path(),
    );

    let resolved = query.get_single("verification").unwrap();
    assert_eq!(resolved.identifier(), "math");
}

#[test]
fn test_demo_bundles_resolve_with_dummy_extensions() {
    let root = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../demos/bundles");
    let query = create_query(Arc::new(UnavailableRegistry::new("demo")), &root);

    let captcha = query.get_single("verification").unwrap();
    assert_eq!(captcha.identifier(), "dummy_captcha");
    assert_eq!(captcha.type_name, extension_dummy::VERIFICATION_TYPE);
    assert!(captcha.instance.as_verification().unwrap().widget().is_some());

    let logins = query.get_all("thirdparty_login");
    assert_eq!(logins.len(), 1);
    assert_eq!(logins[0].type_name, extension_dummy::LOGIN_PROVIDER_TYPE);
}

#[test]
fn test_rows_written_by_external_admin_tooling_are_eligible() {
    let temp_dir = TempDir::new().unwrap();
    let bundles = temp_dir.path().join("bundles");
    write_bundle(
        &bundles,
        &captcha_bundle("simple", "simple", &["Captcha\\Simple"]),
    );

    let db_path = temp_dir.path().join("registry.db");
    let registry = Arc::new(SqliteActivationRegistry::open_at(&db_path).unwrap());
    {
        let conn = rusqlite::Connection::open(&db_path).unwrap();
        conn.execute(
            "INSERT INTO extensions (identifier, capability, status, installed_at)
             VALUES ('simple', 'verification', 'Enabled', datetime('now'))",
            [],
        )
        .unwrap();
    }
    let query = create_query(registry, &bundles);

    let resolved = query.get_single("verification").unwrap();
    assert_eq!(resolved.identifier(), "simple");
    assert_eq!(resolved.source, ResolutionSource::Primary);
    assert_eq!(query.get_all("verification").len(), 1);
}
