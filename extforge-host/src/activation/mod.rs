//! SQLite-backed activation registry
//!
//! The activation registry records which bundles an administrator has
//! installed and enabled for which capability, together with their saved
//! settings. It is written by administrative tooling and only read while
//! answering capability queries.
//!
//! # Database Schema
//!
//! - `extensions`: one row per activation record, ordered by insertion
//! - `schema_version`: Migration tracking

use anyhow::{Context, Result};
use bundle_runtime::ActivationStatus;
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{debug, info, warn};

// ============================================================================
// Records
// ============================================================================

/// A persisted activation row.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivationRecord {
    /// Manifest identifier or bundle directory path.
    pub identifier: String,
    /// Capability tag.
    pub capability: String,
    pub status: ActivationStatus,
    /// Installation timestamp as stored. `None` means not installed; any
    /// other value means installed, whatever its format.
    pub installed_at: Option<String>,
    /// Saved settings, possibly JSON-encoded more than once.
    pub serialized_config: Option<String>,
}

impl ActivationRecord {
    /// Create an enabled, installed record with no configuration.
    pub fn installed(identifier: impl Into<String>, capability: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            capability: capability.into(),
            status: ActivationStatus::Enabled,
            installed_at: Some(Utc::now().to_rfc3339()),
            serialized_config: None,
        }
    }

    /// Attach saved settings.
    pub fn with_config(mut self, serialized_config: impl Into<String>) -> Self {
        self.serialized_config = Some(serialized_config.into());
        self
    }

    /// Installation time, if `installed_at` is RFC3339 or SQLite's
    /// `YYYY-MM-DD HH:MM:SS` (UTC).
    pub fn installed_time(&self) -> Option<DateTime<Utc>> {
        let raw = self.installed_at.as_deref()?.trim();
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|_| {
                NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|dt| dt.and_utc())
            })
            .ok()
    }

    /// Enabled and installed.
    pub fn is_active(&self) -> bool {
        self.status == ActivationStatus::Enabled && self.installed_at.is_some()
    }
}

// ============================================================================
// Registry Trait
// ============================================================================

/// The registry could not be queried.
#[derive(Debug, Error)]
#[error("Activation registry unavailable: {0}")]
pub struct RegistryUnavailable(pub String);

/// Read side of the activation registry.
pub trait ActivationRegistry: Send + Sync {
    /// Enabled and installed records for `capability`, in primary-key order.
    fn enabled_records(
        &self,
        capability: &str,
    ) -> std::result::Result<Vec<ActivationRecord>, RegistryUnavailable>;
}

/// A registry that is never reachable. Used when the database cannot be
/// opened so that queries go straight to degraded mode.
#[derive(Debug, Clone)]
pub struct UnavailableRegistry {
    reason: String,
}

impl UnavailableRegistry {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl ActivationRegistry for UnavailableRegistry {
    fn enabled_records(
        &self,
        _capability: &str,
    ) -> std::result::Result<Vec<ActivationRecord>, RegistryUnavailable> {
        Err(RegistryUnavailable(self.reason.clone()))
    }
}

// ============================================================================
// SqliteActivationRegistry Implementation
// ============================================================================

/// SQLite-based activation registry.
///
/// The connection is wrapped in a `Mutex` to allow interior mutability
/// and to satisfy the `Sync` trait requirement.
pub struct SqliteActivationRegistry {
    conn: Mutex<Connection>,
}

impl SqliteActivationRegistry {
    /// Open the registry database at a specific path, creating it if it
    /// doesn't exist.
    pub fn open_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create registry directory: {:?}", parent))?;
        }

        info!("Opening activation registry at: {:?}", path);

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {:?}", path))?;

        Self::with_connection(conn)
    }

    /// Open a private in-memory registry.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let registry = Self {
            conn: Mutex::new(conn),
        };
        registry.run_migrations()?;
        Ok(registry)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run database migrations to set up the schema.
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            )",
            [],
        )
        .context("Failed to create schema_version table")?;

        let current_version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        debug!("Current registry schema version: {}", current_version);

        if current_version < 1 {
            drop(conn);
            self.migrate_to_v1()?;
        }

        Ok(())
    }

    /// Migration to version 1: Initial schema.
    fn migrate_to_v1(&self) -> Result<()> {
        info!("Running registry migration to schema version 1");

        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "CREATE TABLE IF NOT EXISTS extensions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                identifier TEXT NOT NULL UNIQUE,
                capability TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'disabled',
                installed_at TEXT,
                serialized_config TEXT,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
            [],
        )
        .context("Failed to create extensions table")?;

        tx.execute(
            "CREATE INDEX IF NOT EXISTS idx_extensions_capability
             ON extensions(capability, status)",
            [],
        )?;

        tx.execute("INSERT INTO schema_version (version) VALUES (1)", [])?;

        tx.commit()?;
        Ok(())
    }

    /// Any non-null `installed_at` is kept, whatever type it was stored as.
    fn installed_column(value: ValueRef<'_>) -> Option<String> {
        match value {
            ValueRef::Null => None,
            ValueRef::Integer(i) => Some(i.to_string()),
            ValueRef::Real(f) => Some(f.to_string()),
            ValueRef::Text(t) | ValueRef::Blob(t) => Some(String::from_utf8_lossy(t).into_owned()),
        }
    }

    fn row_to_record(row: &Row<'_>) -> rusqlite::Result<ActivationRecord> {
        let status: String = row.get(2)?;

        Ok(ActivationRecord {
            identifier: row.get(0)?,
            capability: row.get(1)?,
            status: ActivationStatus::parse(&status),
            installed_at: Self::installed_column(row.get_ref(3)?),
            serialized_config: row.get(4)?,
        })
    }

    /// Insert or replace a record. An existing record keeps its position in
    /// enumeration order.
    pub fn upsert_record(&self, record: &ActivationRecord) -> Result<()> {
        let conn = self.conn();

        conn.execute(
            "INSERT INTO extensions
                (identifier, capability, status, installed_at, serialized_config, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, datetime('now'))
             ON CONFLICT(identifier) DO UPDATE SET
                capability = excluded.capability,
                status = excluded.status,
                installed_at = excluded.installed_at,
                serialized_config = excluded.serialized_config,
                updated_at = datetime('now')",
            params![
                &record.identifier,
                &record.capability,
                record.status.as_str(),
                &record.installed_at,
                &record.serialized_config,
            ],
        )
        .with_context(|| format!("Failed to upsert activation record '{}'", record.identifier))?;

        debug!("Upserted activation record: {}", record.identifier);
        Ok(())
    }

    /// Enable or disable a record. Returns whether a record was updated.
    pub fn set_status(&self, identifier: &str, status: ActivationStatus) -> Result<bool> {
        let conn = self.conn();
        let updated = conn.execute(
            "UPDATE extensions SET status = ?2, updated_at = datetime('now')
             WHERE identifier = ?1",
            params![identifier, status.as_str()],
        )?;
        Ok(updated > 0)
    }

    /// Set or clear the installation timestamp. Returns whether a record
    /// was updated.
    pub fn mark_installed(
        &self,
        identifier: &str,
        installed_at: Option<DateTime<Utc>>,
    ) -> Result<bool> {
        let conn = self.conn();
        let updated = conn.execute(
            "UPDATE extensions SET installed_at = ?2, updated_at = datetime('now')
             WHERE identifier = ?1",
            params![identifier, installed_at.map(|dt| dt.to_rfc3339())],
        )?;
        Ok(updated > 0)
    }

    /// Get a single record by identifier.
    pub fn get_record(&self, identifier: &str) -> Result<Option<ActivationRecord>> {
        let conn = self.conn();
        let record = conn
            .query_row(
                "SELECT identifier, capability, status, installed_at, serialized_config
                 FROM extensions WHERE identifier = ?1",
                params![identifier],
                Self::row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    /// All records, in enumeration order.
    pub fn list_records(&self) -> Result<Vec<ActivationRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT identifier, capability, status, installed_at, serialized_config
             FROM extensions ORDER BY id",
        )?;

        let rows = stmt.query_map([], Self::row_to_record)?;
        let records = rows
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Failed to list activation records")?;
        Ok(records)
    }

    fn query_enabled(&self, capability: &str) -> rusqlite::Result<Vec<ActivationRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT identifier, capability, status, installed_at, serialized_config
             FROM extensions
             WHERE capability = ?1
               AND LOWER(TRIM(status)) = 'enabled'
               AND installed_at IS NOT NULL
             ORDER BY id",
        )?;

        let rows = stmt.query_map(params![capability], Self::row_to_record)?;
        let records = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }
}

impl ActivationRegistry for SqliteActivationRegistry {
    fn enabled_records(
        &self,
        capability: &str,
    ) -> std::result::Result<Vec<ActivationRecord>, RegistryUnavailable> {
        self.query_enabled(capability)
            .map_err(|e| RegistryUnavailable(e.to_string()))
    }
}

/// Open the registry at `path`, or an [`UnavailableRegistry`] if that fails.
pub fn open_registry(path: &Path) -> Arc<dyn ActivationRegistry> {
    match SqliteActivationRegistry::open_at(path) {
        Ok(registry) => Arc::new(registry),
        Err(e) => {
            warn!("Activation registry unavailable, using manifests only: {:#}", e);
            Arc::new(UnavailableRegistry::new(format!("{:#}", e)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_registry() -> Result<()> {
        let registry = SqliteActivationRegistry::open_in_memory()?;
        assert!(registry.list_records()?.is_empty());
        assert!(registry.enabled_records("verification")?.is_empty());
        Ok(())
    }

    #[test]
    fn test_enabled_records_filter_and_order() -> Result<()> {
        let registry = SqliteActivationRegistry::open_in_memory()?;

        registry.upsert_record(&ActivationRecord::installed("b", "thirdparty_login"))?;
        registry.upsert_record(&ActivationRecord::installed("a", "thirdparty_login"))?;
        registry.upsert_record(&ActivationRecord::installed("captcha", "verification"))?;

        let mut disabled = ActivationRecord::installed("off", "thirdparty_login");
        disabled.status = ActivationStatus::Disabled;
        registry.upsert_record(&disabled)?;

        let mut uninstalled = ActivationRecord::installed("pending", "thirdparty_login");
        uninstalled.installed_at = None;
        registry.upsert_record(&uninstalled)?;

        let ids: Vec<String> = registry
            .enabled_records("thirdparty_login")?
            .into_iter()
            .map(|r| r.identifier)
            .collect();
        assert_eq!(ids, vec!["b", "a"]);
        Ok(())
    }

    #[test]
    fn test_upsert_keeps_position_and_updates_fields() -> Result<()> {
        let registry = SqliteActivationRegistry::open_in_memory()?;
        registry.upsert_record(&ActivationRecord::installed("first", "verification"))?;
        registry.upsert_record(&ActivationRecord::installed("second", "verification"))?;
        registry.upsert_record(
            &ActivationRecord::installed("first", "verification").with_config(r#"{"a":1}"#),
        )?;

        let records = registry.enabled_records("verification")?;
        assert_eq!(records[0].identifier, "first");
        assert_eq!(records[0].serialized_config.as_deref(), Some(r#"{"a":1}"#));
        assert_eq!(records.len(), 2);
        Ok(())
    }

    #[test]
    fn test_set_status_and_mark_installed() -> Result<()> {
        let registry = SqliteActivationRegistry::open_in_memory()?;
        registry.upsert_record(&ActivationRecord::installed("x", "verification"))?;

        assert!(registry.set_status("x", ActivationStatus::Disabled)?);
        assert!(registry.enabled_records("verification")?.is_empty());

        assert!(registry.set_status("x", ActivationStatus::Enabled)?);
        assert!(registry.mark_installed("x", None)?);
        assert!(registry.enabled_records("verification")?.is_empty());
        assert!(!registry.get_record("x")?.unwrap().is_active());

        assert!(registry.mark_installed("x", Some(Utc::now()))?);
        assert_eq!(registry.enabled_records("verification")?.len(), 1);

        assert!(!registry.set_status("missing", ActivationStatus::Enabled)?);
        Ok(())
    }

    #[test]
    fn test_any_non_null_installed_at_is_installed() -> Result<()> {
        let registry = SqliteActivationRegistry::open_in_memory()?;
        registry.upsert_record(&ActivationRecord::installed("rfc", "verification"))?;
        registry.conn().execute(
            "INSERT INTO extensions (identifier, capability, status, installed_at)
             VALUES ('sqlite', 'verification', 'enabled', datetime('now')),
                    ('epoch', 'verification', 'enabled', 1700000000),
                    ('free', 'verification', 'enabled', 'yesterday')",
            [],
        )?;

        let records = registry.enabled_records("verification")?;
        let ids: Vec<&str> = records.iter().map(|r| r.identifier.as_str()).collect();
        assert_eq!(ids, vec!["rfc", "sqlite", "epoch", "free"]);
        assert!(records.iter().all(ActivationRecord::is_active));

        assert!(records[0].installed_time().is_some());
        assert!(records[1].installed_time().is_some());
        assert!(records[3].installed_time().is_none());
        Ok(())
    }

    #[test]
    fn test_status_matching_ignores_case_and_padding() -> Result<()> {
        let registry = SqliteActivationRegistry::open_in_memory()?;
        registry.conn().execute(
            "INSERT INTO extensions (identifier, capability, status, installed_at)
             VALUES ('upper', 'verification', 'Enabled', datetime('now')),
                    ('padded', 'verification', ' ENABLED ', datetime('now')),
                    ('off', 'verification', 'Disabled', datetime('now'))",
            [],
        )?;

        let listed: Vec<ActivationRecord> = registry
            .list_records()?
            .into_iter()
            .filter(ActivationRecord::is_active)
            .collect();
        let enabled = registry.enabled_records("verification")?;

        assert_eq!(enabled, listed);
        assert_eq!(enabled.len(), 2);
        assert_eq!(registry.get_record("upper")?.unwrap().status, ActivationStatus::Enabled);
        Ok(())
    }

    #[test]
    fn test_reopen_keeps_records() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("nested").join("registry.db");

        {
            let registry = SqliteActivationRegistry::open_at(&path)?;
            registry.upsert_record(&ActivationRecord::installed("x", "verification"))?;
        }

        let registry = SqliteActivationRegistry::open_at(&path)?;
        assert_eq!(registry.list_records()?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_open_registry_falls_back_when_unopenable() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        let registry = open_registry(&blocker.join("registry.db"));
        assert!(registry.enabled_records("verification").is_err());
    }

    #[test]
    fn test_unavailable_registry() {
        let registry = UnavailableRegistry::new("database locked");
        let err = registry.enabled_records("verification").unwrap_err();
        assert!(err.to_string().contains("database locked"));
    }
}
