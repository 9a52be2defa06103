//! Storage layer for Quartermaster settings.
//!
//! [`SettingsStore`] is the typed layer: it owns type coercion, the
//! create/update verbs and category queries. Persistence is delegated to a
//! [`StorageBackend`], which only ever sees untyped [`SettingRecord`]s.
//!
//! ## Storage Backends
//!
//! - **SQLite backend** (default): `~/.local/share/quartermaster/settings.db`
//! - **Memory backend**: selected with the store location `:memory:`
//!
//! [`SettingRecord`]: crate::models::SettingRecord

pub mod backend;
pub mod memory;
pub mod sqlite;

pub use backend::{BackendType, StorageBackend};
pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::models::{Setting, SettingRecord, SettingType, SettingValue};
use crate::{Error, Result};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "QM_DATA_DIR";

/// Store location selecting the in-memory backend.
pub const MEMORY_LOCATION: &str = ":memory:";

/// How raw input that does not fit a setting's type is handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DecodeMode {
    /// Substitute the type's fallback value (0, false, null)
    #[default]
    Lenient,
    /// Reject the write with [`Error::Decode`]
    Strict,
}

/// Which settings a listing covers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SettingFilter {
    #[default]
    All,
    Category(String),
    Uncategorized,
}

impl SettingFilter {
    fn matches(&self, setting: &Setting) -> bool {
        match self {
            SettingFilter::All => true,
            SettingFilter::Category(name) => setting.in_category(name),
            SettingFilter::Uncategorized => setting.category.is_none(),
        }
    }
}

/// A category name with the number of settings in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WritePolicy {
    Upsert,
    CreateOnly,
    UpdateOnly,
}

/// Typed settings store over a record backend.
pub struct SettingsStore<B: StorageBackend> {
    backend: B,
    mode: DecodeMode,
    default_type: SettingType,
}

impl<B: StorageBackend> SettingsStore<B> {
    /// Create a store with lenient decoding.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            mode: DecodeMode::default(),
            default_type: SettingType::default(),
        }
    }

    /// Set the decode mode.
    pub fn with_mode(mut self, mode: DecodeMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the type given to new settings created without one.
    pub fn with_default_type(mut self, default_type: SettingType) -> Self {
        self.default_type = default_type;
        self
    }

    pub fn mode(&self) -> DecodeMode {
        self.mode
    }

    pub fn default_type(&self) -> SettingType {
        self.default_type
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Storage location description (for display purposes).
    pub fn location(&self) -> String {
        self.backend.location()
    }

    // === Reads ===

    /// Get the typed value of a setting. Absence is `Ok(None)`, not an error.
    pub fn get(&self, key: &str) -> Result<Option<SettingValue>> {
        Ok(self.get_setting(key)?.map(|s| s.value))
    }

    /// Get the typed value of a setting, or `default` when it is absent.
    pub fn get_or(&self, key: &str, default: SettingValue) -> Result<SettingValue> {
        Ok(self.get(key)?.unwrap_or(default))
    }

    /// Get the full setting (type, category, timestamps).
    pub fn get_setting(&self, key: &str) -> Result<Option<Setting>> {
        tracing::debug!(key, "get setting");
        self.backend
            .load(key)?
            .map(Setting::from_record)
            .transpose()
    }

    /// Check whether a setting exists. Never decodes or modifies anything.
    pub fn has(&self, key: &str) -> Result<bool> {
        Ok(self.backend.load(key)?.is_some())
    }

    /// Snapshot of all settings.
    pub fn all(&self) -> Result<BTreeMap<String, SettingValue>> {
        self.values(&SettingFilter::All)
    }

    /// Snapshot of the settings whose category equals `name`.
    pub fn category(&self, name: &str) -> Result<BTreeMap<String, SettingValue>> {
        self.values(&SettingFilter::Category(name.to_string()))
    }

    /// Snapshot of the settings without a category.
    pub fn uncategorized(&self) -> Result<BTreeMap<String, SettingValue>> {
        self.values(&SettingFilter::Uncategorized)
    }

    /// Full settings matching a filter, sorted by key.
    pub fn settings(&self, filter: &SettingFilter) -> Result<Vec<Setting>> {
        let mut settings = Vec::new();
        for record in self.backend.records()? {
            let setting = Setting::from_record(record)?;
            if filter.matches(&setting) {
                settings.push(setting);
            }
        }
        settings.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(settings)
    }

    /// Distinct category names with their setting counts, sorted by name.
    pub fn categories(&self) -> Result<Vec<CategorySummary>> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for record in self.backend.records()? {
            if let Some(category) = record.category {
                *counts.entry(category).or_default() += 1;
            }
        }
        Ok(counts
            .into_iter()
            .map(|(name, count)| CategorySummary { name, count })
            .collect())
    }

    fn values(&self, filter: &SettingFilter) -> Result<BTreeMap<String, SettingValue>> {
        Ok(self
            .settings(filter)?
            .into_iter()
            .map(|s| (s.key, s.value))
            .collect())
    }

    // === Writes ===

    /// Create or update a setting.
    ///
    /// A new key is created with `setting_type` (falling back to the store's
    /// default type, `string` unless configured) and `category`. For an existing key, `raw` is decoded through the stored
    /// type and only the value changes; `setting_type` and `category` are
    /// ignored.
    pub fn set(
        &mut self,
        key: &str,
        raw: &str,
        category: Option<&str>,
        setting_type: Option<SettingType>,
    ) -> Result<Setting> {
        self.write(key, raw, category, setting_type, WritePolicy::Upsert)
    }

    /// Create a setting. Fails with [`Error::AlreadyExists`] if the key is taken.
    pub fn add(
        &mut self,
        key: &str,
        raw: &str,
        category: Option<&str>,
        setting_type: Option<SettingType>,
    ) -> Result<Setting> {
        self.write(key, raw, category, setting_type, WritePolicy::CreateOnly)
    }

    /// Update an existing setting's value. Fails with [`Error::NotFound`] if
    /// the key is absent. The category is left untouched.
    pub fn change(&mut self, key: &str, raw: &str) -> Result<Setting> {
        self.write(key, raw, None, None, WritePolicy::UpdateOnly)
    }

    /// Delete a setting. Fails with [`Error::NotFound`] if the key is absent.
    pub fn forget(&mut self, key: &str) -> Result<()> {
        if !self.backend.remove(key)? {
            return Err(Error::NotFound(key.to_string()));
        }
        tracing::info!(key, "setting forgotten");
        Ok(())
    }

    /// Store an already-typed setting, as read from an export document.
    ///
    /// Returns false without writing when the key exists and `overwrite` is
    /// not set. An overwritten setting takes the imported type and category.
    pub fn import(&mut self, setting: Setting, overwrite: bool) -> Result<bool> {
        validate_key(&setting.key)?;
        validate_category(setting.category.as_deref())?;
        if !overwrite && self.has(&setting.key)? {
            tracing::debug!(key = %setting.key, "import skipped existing setting");
            return Ok(false);
        }
        self.backend.store(&setting.to_record())?;
        tracing::info!(key = %setting.key, "setting imported");
        Ok(true)
    }

    fn write(
        &mut self,
        key: &str,
        raw: &str,
        category: Option<&str>,
        setting_type: Option<SettingType>,
        policy: WritePolicy,
    ) -> Result<Setting> {
        validate_key(key)?;
        validate_category(category)?;
        let mode = self.mode;
        let default_type = self.default_type;

        let record = self.backend.update(key, &mut |current: Option<SettingRecord>| {
            let setting = match current {
                Some(record) => {
                    if policy == WritePolicy::CreateOnly {
                        return Err(Error::AlreadyExists(key.to_string()));
                    }
                    let mut setting = Setting::from_record(record)?;
                    if let Some(requested) = setting_type {
                        if requested != setting.setting_type {
                            tracing::debug!(
                                key,
                                stored = %setting.setting_type,
                                %requested,
                                "ignoring type for existing setting"
                            );
                        }
                    }
                    setting.value = decode(key, setting.setting_type, raw, mode)?;
                    setting.updated_at = Utc::now();
                    setting
                }
                None => {
                    if policy == WritePolicy::UpdateOnly {
                        return Err(Error::NotFound(key.to_string()));
                    }
                    let setting_type = setting_type.unwrap_or(default_type);
                    let value = decode(key, setting_type, raw, mode)?;
                    Setting::new(key.to_string(), value, category.map(str::to_string))
                }
            };
            Ok(setting.to_record())
        })?;

        let setting = Setting::from_record(record)?;
        tracing::info!(key, setting_type = %setting.setting_type, "setting written");
        Ok(setting)
    }
}

/// Decode `raw` through `setting_type` under the given mode.
fn decode(key: &str, setting_type: SettingType, raw: &str, mode: DecodeMode) -> Result<SettingValue> {
    let decoded = setting_type.decode(raw);
    if decoded.lossy {
        if mode == DecodeMode::Strict {
            return Err(Error::Decode {
                key: key.to_string(),
                expected: setting_type,
                input: raw.to_string(),
            });
        }
        tracing::warn!(
            key,
            input = raw,
            fallback = %decoded.value,
            "input is not a valid {}, stored fallback value",
            setting_type
        );
    }
    Ok(decoded.value)
}

/// Validate a setting key: non-empty and free of whitespace.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::InvalidInput("Setting key must not be empty".to_string()));
    }
    if key.chars().any(char::is_whitespace) {
        return Err(Error::InvalidInput(format!(
            "Setting key must not contain whitespace: {:?}",
            key
        )));
    }
    Ok(())
}

/// Validate a category name: when present it must not be blank.
pub fn validate_category(category: Option<&str>) -> Result<()> {
    match category {
        Some(name) if name.trim().is_empty() => Err(Error::InvalidInput(
            "Category must not be empty (omit it for an uncategorized setting)".to_string(),
        )),
        _ => Ok(()),
    }
}

impl<B: StorageBackend + ?Sized> StorageBackend for Box<B> {
    fn load(&self, key: &str) -> Result<Option<SettingRecord>> {
        (**self).load(key)
    }

    fn store(&mut self, record: &SettingRecord) -> Result<()> {
        (**self).store(record)
    }

    fn remove(&mut self, key: &str) -> Result<bool> {
        (**self).remove(key)
    }

    fn records(&self) -> Result<Vec<SettingRecord>> {
        (**self).records()
    }

    fn update(
        &mut self,
        key: &str,
        f: &mut dyn FnMut(Option<SettingRecord>) -> Result<SettingRecord>,
    ) -> Result<SettingRecord> {
        (**self).update(key, f)
    }

    fn location(&self) -> String {
        (**self).location()
    }

    fn backend_type(&self) -> BackendType {
        (**self).backend_type()
    }
}

/// Get the data directory for Quartermaster.
///
/// Uses `QM_DATA_DIR` when set, otherwise `~/.local/share/quartermaster/`
/// (or the platform equivalent).
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }

    let data_dir = dirs::data_dir()
        .ok_or_else(|| Error::Other("Could not determine data directory".to_string()))?;
    Ok(data_dir.join("quartermaster"))
}

/// Default location of the settings database.
pub fn default_store_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("settings.db"))
}

/// Open the backend for a store location.
///
/// `:memory:` selects the memory backend; any other path opens (or creates)
/// an SQLite database there.
pub fn open_backend(location: &Path) -> Result<Box<dyn StorageBackend>> {
    match BackendType::for_location(location) {
        BackendType::Memory => Ok(Box::new(MemoryBackend::new())),
        BackendType::Sqlite => Ok(Box::new(SqliteBackend::open(location)?)),
    }
}
