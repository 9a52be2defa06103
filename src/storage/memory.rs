//! In-memory storage backend.

use std::collections::HashMap;

use super::MEMORY_LOCATION;
use super::backend::{BackendType, StorageBackend};
use crate::Result;
use crate::models::SettingRecord;

/// Backend keeping records in a `HashMap`. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    records: HashMap<String, SettingRecord>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryBackend {
    fn load(&self, key: &str) -> Result<Option<SettingRecord>> {
        Ok(self.records.get(key).cloned())
    }

    fn store(&mut self, record: &SettingRecord) -> Result<()> {
        self.records.insert(record.key.clone(), record.clone());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<bool> {
        Ok(self.records.remove(key).is_some())
    }

    fn records(&self) -> Result<Vec<SettingRecord>> {
        Ok(self.records.values().cloned().collect())
    }

    fn location(&self) -> String {
        MEMORY_LOCATION.to_string()
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Memory
    }
}
