//! Audit log service - gateway request/response trail in DuckDB
//!
//! Stores every gateway leg in audit.duckdb. Events reach this store already
//! redacted (see [`crate::domain::redaction`]); the store never sees a
//! password, token, plaintext account or image payload.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use chrono::Utc;
use duckdb::{Connection, Row};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::audit_migrations::AUDIT_MIGRATIONS;
use crate::domain::result::{Error, Result as DomainResult};
use crate::domain::AuditEvent;
use crate::ports::AuditSink;

/// File name of the audit database inside the qrpay directory
pub const AUDIT_DB_FILENAME: &str = "audit.duckdb";

/// Counter for generating unique IDs within the same millisecond
static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a unique ID based on timestamp + counter
fn generate_id() -> u64 {
    let timestamp = u64::try_from(now_ms()).unwrap_or_default();

    // Lower 16 bits: counter (65536 IDs per millisecond)
    let counter = ID_COUNTER.fetch_add(1, Ordering::Relaxed) & 0xFFFF;
    (timestamp << 16) | counter
}

/// Current unix timestamp in milliseconds
fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, timestamp, app_version, leg, method, url, transaction_id,
           request_json, status, response_json, error_message, duration_ms
    FROM audit_events
"#;

/// An audit entry as stored in the database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: u64,
    pub timestamp: i64,
    pub app_version: String,
    pub leg: String,
    pub method: String,
    pub url: String,
    pub transaction_id: Option<String>,
    pub request: JsonValue,
    pub status: Option<u16>,
    pub response: Option<JsonValue>,
    pub error_message: Option<String>,
    pub duration_ms: i64,
}

impl AuditEntry {
    fn from_row(row: &Row<'_>) -> duckdb::Result<Self> {
        let request: Option<String> = row.get(7)?;
        let status: Option<i32> = row.get(8)?;
        let response: Option<String> = row.get(9)?;

        Ok(Self {
            id: row.get(0)?,
            timestamp: row.get(1)?,
            app_version: row.get(2)?,
            leg: row.get(3)?,
            method: row.get(4)?,
            url: row.get(5)?,
            transaction_id: row.get(6)?,
            request: request
                .and_then(|s| serde_json::from_str(&s).ok())
                .unwrap_or(JsonValue::Null),
            status: status.and_then(|s| u16::try_from(s).ok()),
            response: response.and_then(|s| serde_json::from_str(&s).ok()),
            error_message: row.get(10)?,
            duration_ms: row.get(11)?,
        })
    }

    pub fn is_failure(&self) -> bool {
        self.error_message.is_some()
    }
}

/// DuckDB-backed audit trail
///
/// Opens or creates audit.duckdb and applies pending migrations on creation.
pub struct AuditLogService {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    app_version: String,
}

impl AuditLogService {
    /// Open the audit store in the given directory
    pub fn new(qrpay_dir: &Path, app_version: impl Into<String>) -> Result<Self> {
        let db_path = qrpay_dir.join(AUDIT_DB_FILENAME);
        let conn = Connection::open(&db_path)?;

        let service = Self {
            conn: Mutex::new(conn),
            db_path,
            app_version: app_version.into(),
        };

        service.run_migrations()?;

        Ok(service)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))
    }

    /// Run any pending migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.lock()?;

        let table_exists: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM information_schema.tables WHERE table_name = 'sys_migrations'",
                [],
                |row| row.get(0),
            )
            .unwrap_or(false);

        // Bootstrap migrations table if needed
        if !table_exists {
            if let Some((name, sql)) = AUDIT_MIGRATIONS.iter().find(|(n, _)| *n == "000_migrations.sql") {
                conn.execute_batch(sql)?;
                conn.execute("INSERT INTO sys_migrations (migration_name) VALUES (?)", [name])?;
            }
        }

        let mut stmt = conn.prepare("SELECT migration_name FROM sys_migrations")?;
        let applied: Vec<String> = stmt
            .query_map([], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();

        for (name, sql) in AUDIT_MIGRATIONS.iter() {
            if *name == "000_migrations.sql" || applied.iter().any(|a| a == name) {
                continue;
            }
            conn.execute_batch(sql)?;
            conn.execute("INSERT INTO sys_migrations (migration_name) VALUES (?)", [name])?;
        }

        Ok(())
    }

    /// Store one event
    pub fn log(&self, event: &AuditEvent) -> Result<()> {
        let conn = self.lock()?;

        let request_json = serde_json::to_string(&event.request)?;
        let response_json = event
            .response
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        conn.execute(
            r#"
            INSERT INTO audit_events (
                id, timestamp, app_version, leg, method, url, transaction_id,
                request_json, status, response_json, error_message, duration_ms
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            duckdb::params![
                generate_id(),
                now_ms(),
                &self.app_version,
                event.leg.as_str(),
                &event.method,
                &event.url,
                &event.transaction_id,
                request_json,
                event.status.map(i32::from),
                response_json,
                &event.error,
                i64::try_from(event.duration_ms).unwrap_or(i64::MAX),
            ],
        )?;

        Ok(())
    }

    fn query(&self, filter: &str, params: &[&dyn duckdb::ToSql]) -> Result<Vec<AuditEntry>> {
        let conn = self.lock()?;
        let sql = format!("{} {} ORDER BY timestamp DESC, id DESC LIMIT ?", SELECT_COLUMNS, filter);
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map(params, AuditEntry::from_row)?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(entries)
    }

    /// Most recent entries, newest first
    pub fn recent(&self, limit: usize) -> Result<Vec<AuditEntry>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.query("", &[&limit])
    }

    /// Most recent failed legs
    pub fn failures(&self, limit: usize) -> Result<Vec<AuditEntry>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.query("WHERE error_message IS NOT NULL", &[&limit])
    }

    /// Every leg recorded for one transaction
    pub fn for_transaction(&self, transaction_id: &str, limit: usize) -> Result<Vec<AuditEntry>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.query("WHERE transaction_id = ?", &[&transaction_id, &limit])
    }

    /// Total number of entries
    pub fn count(&self) -> Result<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM audit_events", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// Delete entries older than the given unix timestamp in milliseconds
    pub fn delete_before(&self, timestamp_ms: i64) -> Result<u64> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM audit_events WHERE timestamp < ?", [timestamp_ms])?;
        Ok(u64::try_from(deleted).unwrap_or(u64::MAX))
    }

    /// Copy the audit database for troubleshooting
    pub fn export(&self, output_path: &Path) -> Result<PathBuf> {
        let conn = self.lock()?;

        // Flush the WAL so the copy is complete
        conn.execute("CHECKPOINT", [])?;
        std::fs::copy(&self.db_path, output_path)?;

        Ok(output_path.to_path_buf())
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

impl AuditSink for AuditLogService {
    fn record(&self, event: &AuditEvent) -> DomainResult<()> {
        self.log(event).map_err(|e| Error::Database(e.to_string()))
    }
}
