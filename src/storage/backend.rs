//! Storage backend trait and implementations.
//!
//! This module provides the record stores beneath [`SettingsStore`]:
//! - `SqliteBackend` - SQLite database file (default)
//! - `MemoryBackend` - In-process map, nothing persisted
//!
//! [`SettingsStore`]: super::SettingsStore

use serde::Serialize;
use std::path::Path;

use super::MEMORY_LOCATION;
use crate::Result;
use crate::models::SettingRecord;

/// Trait for storage backends that handle raw record persistence.
///
/// Backends never decode values; they store and return records verbatim.
pub trait StorageBackend {
    /// Load the record for a key, if present.
    fn load(&self, key: &str) -> Result<Option<SettingRecord>>;

    /// Insert or replace a record.
    fn store(&mut self, record: &SettingRecord) -> Result<()>;

    /// Remove a record. Returns true if a record was removed.
    fn remove(&mut self, key: &str) -> Result<bool>;

    /// Load all records.
    fn records(&self) -> Result<Vec<SettingRecord>>;

    /// Read-modify-write a single record.
    ///
    /// `f` receives the current record (if any) and returns the record to
    /// store. Backends shared between processes override this to make the
    /// read and the write atomic; the last writer wins.
    fn update(
        &mut self,
        key: &str,
        f: &mut dyn FnMut(Option<SettingRecord>) -> Result<SettingRecord>,
    ) -> Result<SettingRecord> {
        let current = self.load(key)?;
        let next = f(current)?;
        self.store(&next)?;
        Ok(next)
    }

    /// Get the storage location description (for display purposes).
    fn location(&self) -> String;

    /// Get the backend type.
    fn backend_type(&self) -> BackendType;
}

/// Available storage backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// SQLite database file (default) - ~/.local/share/quartermaster/settings.db
    Sqlite,
    /// In-memory map, discarded when the process exits
    Memory,
}

impl BackendType {
    /// Backend type selected by a store location.
    ///
    /// `:memory:` selects the memory backend; every other location is an
    /// SQLite database file.
    pub fn for_location(location: &Path) -> Self {
        if location.as_os_str() == MEMORY_LOCATION {
            Self::Memory
        } else {
            Self::Sqlite
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Memory => "memory",
        }
    }
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
