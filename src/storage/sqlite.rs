//! SQLite storage backend.
//!
//! Records live in a single `settings` table. Timestamps are stored as
//! RFC 3339 text and values in their display form; decoding is left to the
//! settings store.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::backend::{BackendType, StorageBackend};
use crate::models::SettingRecord;
use crate::{Error, Result};

/// How long a writer waits on a lock held by another process.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Raw column values of a `settings` row, before timestamp parsing.
type RawRow = (String, String, String, Option<String>, String, String);

/// Backend storing records in an SQLite database.
pub struct SqliteBackend {
    /// Database file, `None` for an in-memory database
    path: Option<PathBuf>,
    conn: Connection,
}

impl SqliteBackend {
    /// Open (or create) the database at `path`.
    ///
    /// Parent directories are created as needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Self::init_schema(&conn)?;

        Ok(Self {
            path: Some(path.to_path_buf()),
            conn,
        })
    }

    /// Open a private in-memory database.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self { path: None, conn })
    }

    /// Path of the database file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Initialize the SQLite schema.
    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                type TEXT NOT NULL DEFAULT 'string',
                value TEXT NOT NULL,
                category TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_settings_category ON settings(category);
            "#,
        )?;
        Ok(())
    }
}

fn parse_timestamp(key: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Corrupt {
            key: key.to_string(),
            reason: format!("bad timestamp {:?}: {}", value, e),
        })
}

fn record_from_row(row: RawRow) -> Result<SettingRecord> {
    let (key, setting_type, value, category, created_at, updated_at) = row;
    let created_at = parse_timestamp(&key, &created_at)?;
    let updated_at = parse_timestamp(&key, &updated_at)?;
    Ok(SettingRecord {
        key,
        setting_type,
        value,
        category,
        created_at,
        updated_at,
    })
}

fn load_record(conn: &Connection, key: &str) -> Result<Option<SettingRecord>> {
    let row: Option<RawRow> = conn
        .query_row(
            "SELECT key, type, value, category, created_at, updated_at FROM settings WHERE key = ?1",
            [key],
            |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            },
        )
        .optional()?;
    row.map(record_from_row).transpose()
}

fn store_record(conn: &Connection, record: &SettingRecord) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO settings (key, type, value, category, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(key) DO UPDATE SET
            type = excluded.type,
            value = excluded.value,
            category = excluded.category,
            created_at = excluded.created_at,
            updated_at = excluded.updated_at
        "#,
        params![
            record.key,
            record.setting_type,
            record.value,
            record.category,
            record.created_at.to_rfc3339(),
            record.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

impl StorageBackend for SqliteBackend {
    fn load(&self, key: &str) -> Result<Option<SettingRecord>> {
        load_record(&self.conn, key)
    }

    fn store(&mut self, record: &SettingRecord) -> Result<()> {
        store_record(&self.conn, record)
    }

    fn remove(&mut self, key: &str) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM settings WHERE key = ?1", [key])?;
        Ok(removed > 0)
    }

    fn records(&self) -> Result<Vec<SettingRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT key, type, value, category, created_at, updated_at FROM settings ORDER BY key",
        )?;
        let rows: Vec<RawRow> = stmt
            .query_map([], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            })?
            .collect::<rusqlite::Result<_>>()?;
        rows.into_iter().map(record_from_row).collect()
    }

    fn update(
        &mut self,
        key: &str,
        f: &mut dyn FnMut(Option<SettingRecord>) -> Result<SettingRecord>,
    ) -> Result<SettingRecord> {
        // IMMEDIATE takes the write lock up front so no other writer can
        // slip in between the read and the write.
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let current = load_record(&tx, key)?;
        let next = f(current)?;
        store_record(&tx, &next)?;
        tx.commit()?;
        Ok(next)
    }

    fn location(&self) -> String {
        match &self.path {
            Some(path) => path.display().to_string(),
            None => ":memory:".to_string(),
        }
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Sqlite
    }
}
