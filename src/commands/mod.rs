//! Command implementations for the Quartermaster CLI.
//!
//! Each command takes the settings store as an explicit handle and returns
//! a value implementing [`Output`], which the binary renders as JSON or as
//! human-readable text. Commands never print or exit on their own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{QuartermasterConfig, ResolvedConfig, ValueSource, write_config};
use crate::models::{Setting, SettingType, SettingValue};
use crate::storage::{
    BackendType, CategorySummary, SettingFilter, SettingsStore, StorageBackend, validate_category,
    validate_key,
};
use crate::{Error, Result};

/// Current export document version.
pub const EXPORT_VERSION: u32 = 1;

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

fn json_line<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }).to_string())
}

// === get ===

/// Result of `qm get`.
#[derive(Debug, Serialize)]
pub struct SettingValueResult {
    pub key: String,
    #[serde(rename = "type")]
    pub setting_type: SettingType,
    pub value: SettingValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// False when the caller-supplied default was substituted
    pub found: bool,
}

impl Output for SettingValueResult {
    fn to_json(&self) -> String {
        json_line(self)
    }

    fn to_human(&self) -> String {
        self.value.to_string()
    }
}

/// Get a setting, substituting `default` when it is absent.
///
/// Without a default, an absent key is [`Error::NotFound`].
pub fn setting_get<B: StorageBackend>(
    store: &SettingsStore<B>,
    key: &str,
    default: Option<&str>,
) -> Result<SettingValueResult> {
    match store.get_setting(key)? {
        Some(setting) => Ok(SettingValueResult {
            key: setting.key,
            setting_type: setting.setting_type,
            value: setting.value,
            category: setting.category,
            found: true,
        }),
        None => match default {
            Some(default) => Ok(SettingValueResult {
                key: key.to_string(),
                setting_type: SettingType::String,
                value: SettingValue::String(default.to_string()),
                category: None,
                found: false,
            }),
            None => Err(Error::NotFound(key.to_string())),
        },
    }
}

// === set / add / change ===

/// Result of a write command.
#[derive(Debug, Serialize)]
pub struct SettingWritten {
    /// "created" or "updated"
    pub action: &'static str,
    pub setting: Setting,
}

impl SettingWritten {
    fn new(created: bool, setting: Setting) -> Self {
        Self {
            action: if created { "created" } else { "updated" },
            setting,
        }
    }
}

impl Output for SettingWritten {
    fn to_json(&self) -> String {
        json_line(self)
    }

    fn to_human(&self) -> String {
        let mut line = format!(
            "{} {} = {} ({})",
            if self.action == "created" { "Created" } else { "Updated" },
            self.setting.key,
            self.setting.value,
            self.setting.setting_type
        );
        if let Some(ref category) = self.setting.category {
            line.push_str(&format!(" [{}]", category));
        }
        line
    }
}

/// Create or update a setting.
///
/// Without `setting_type`, a new key takes the store's default type.
pub fn setting_set<B: StorageBackend>(
    store: &mut SettingsStore<B>,
    key: &str,
    value: &str,
    category: Option<&str>,
    setting_type: Option<SettingType>,
) -> Result<SettingWritten> {
    let created = !store.has(key)?;
    let setting = store.set(key, value, category, setting_type)?;
    Ok(SettingWritten::new(created, setting))
}

/// Create a new setting; fails if the key already exists.
pub fn setting_add<B: StorageBackend>(
    store: &mut SettingsStore<B>,
    key: &str,
    value: &str,
    category: Option<&str>,
    setting_type: Option<SettingType>,
) -> Result<SettingWritten> {
    let setting = store.add(key, value, category, setting_type)?;
    Ok(SettingWritten::new(true, setting))
}

/// Change the value of an existing setting; fails if the key is absent.
pub fn setting_change<B: StorageBackend>(
    store: &mut SettingsStore<B>,
    key: &str,
    value: &str,
) -> Result<SettingWritten> {
    let setting = store.change(key, value)?;
    Ok(SettingWritten::new(false, setting))
}

// === has ===

/// Result of `qm has`.
#[derive(Debug, Serialize)]
pub struct SettingExists {
    pub key: String,
    pub exists: bool,
}

impl Output for SettingExists {
    fn to_json(&self) -> String {
        json_line(self)
    }

    fn to_human(&self) -> String {
        if self.exists {
            format!("{} exists", self.key)
        } else {
            format!("{} not found", self.key)
        }
    }
}

/// Check whether a setting exists.
pub fn setting_has<B: StorageBackend>(store: &SettingsStore<B>, key: &str) -> Result<SettingExists> {
    Ok(SettingExists {
        key: key.to_string(),
        exists: store.has(key)?,
    })
}

// === list ===

/// Result of `qm list`.
#[derive(Debug, Serialize)]
pub struct SettingList {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub count: usize,
    pub settings: Vec<Setting>,
}

impl Output for SettingList {
    fn to_json(&self) -> String {
        json_line(self)
    }

    fn to_human(&self) -> String {
        if self.settings.is_empty() {
            return match self.category {
                Some(ref category) => format!("No settings in category '{}'.", category),
                None => "No settings.".to_string(),
            };
        }

        let headers = ["KEY", "TYPE", "CATEGORY", "VALUE"];
        let rows: Vec<[String; 4]> = self
            .settings
            .iter()
            .map(|s| {
                [
                    s.key.clone(),
                    s.setting_type.to_string(),
                    s.category.clone().unwrap_or_else(|| "-".to_string()),
                    s.value.to_string(),
                ]
            })
            .collect();

        let mut widths = headers.map(str::len);
        for row in &rows {
            for (width, cell) in widths.iter_mut().zip(row.iter()) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let format_row = |cells: [&str; 4]| {
            let mut line = String::new();
            for (i, cell) in cells.iter().enumerate() {
                if i + 1 == cells.len() {
                    line.push_str(cell);
                } else {
                    line.push_str(&format!("{:<width$}  ", cell, width = widths[i]));
                }
            }
            line
        };

        let mut lines = vec![format_row(headers)];
        for row in &rows {
            lines.push(format_row([
                row[0].as_str(),
                row[1].as_str(),
                row[2].as_str(),
                row[3].as_str(),
            ]));
        }
        lines.push(String::new());
        lines.push(format!(
            "{} setting{}",
            self.settings.len(),
            if self.settings.len() == 1 { "" } else { "s" }
        ));
        lines.join("\n")
    }
}

/// List settings matching a filter.
pub fn setting_list<B: StorageBackend>(
    store: &SettingsStore<B>,
    filter: &SettingFilter,
) -> Result<SettingList> {
    let settings = store.settings(filter)?;
    let category = match filter {
        SettingFilter::Category(name) => Some(name.clone()),
        _ => None,
    };
    Ok(SettingList {
        category,
        count: settings.len(),
        settings,
    })
}

// === categories ===

/// Result of `qm categories`.
#[derive(Debug, Serialize)]
pub struct CategoryList {
    pub categories: Vec<CategorySummary>,
    /// Number of settings without a category
    pub uncategorized: usize,
}

impl Output for CategoryList {
    fn to_json(&self) -> String {
        json_line(self)
    }

    fn to_human(&self) -> String {
        let mut lines: Vec<String> = self
            .categories
            .iter()
            .map(|c| format!("{} ({})", c.name, c.count))
            .collect();
        if self.uncategorized > 0 {
            lines.push(format!("(uncategorized) ({})", self.uncategorized));
        }
        if lines.is_empty() {
            return "No categories.".to_string();
        }
        lines.join("\n")
    }
}

/// List distinct categories with their setting counts.
pub fn category_list<B: StorageBackend>(store: &SettingsStore<B>) -> Result<CategoryList> {
    Ok(CategoryList {
        categories: store.categories()?,
        uncategorized: store.uncategorized()?.len(),
    })
}

// === forget ===

/// Result of `qm forget`.
#[derive(Debug, Serialize)]
pub struct SettingForgotten {
    pub key: String,
    pub forgotten: bool,
}

impl Output for SettingForgotten {
    fn to_json(&self) -> String {
        json_line(self)
    }

    fn to_human(&self) -> String {
        format!("Forgot {}", self.key)
    }
}

/// Delete a setting behind a confirmation guard.
///
/// The key must exist ([`Error::NotFound`] otherwise). Unless `force` is
/// set, `confirm` is asked with a prompt and a `false` answer aborts with
/// [`Error::Aborted`] without touching the store.
pub fn setting_forget<B: StorageBackend>(
    store: &mut SettingsStore<B>,
    key: &str,
    force: bool,
    confirm: &mut dyn FnMut(&str) -> Result<bool>,
) -> Result<SettingForgotten> {
    if !store.has(key)? {
        return Err(Error::NotFound(key.to_string()));
    }

    if !force {
        let prompt = format!("Forget setting '{}'? This cannot be undone. [y/N] ", key);
        if !confirm(&prompt)? {
            tracing::info!(key, "forget declined");
            return Err(Error::Aborted);
        }
    }

    store.forget(key)?;
    Ok(SettingForgotten {
        key: key.to_string(),
        forgotten: true,
    })
}

/// Interpret a confirmation answer: only `y` and `yes` (any case) agree.
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

// === export / import ===

/// Portable JSON document holding a full copy of the store.
#[derive(Debug, Serialize)]
pub struct ExportDocument {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub settings: Vec<Setting>,
}

impl Output for ExportDocument {
    fn to_json(&self) -> String {
        serde_json::to_string_pretty(self)
            .unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }).to_string())
    }

    fn to_human(&self) -> String {
        self.to_json()
    }
}

/// Snapshot the whole store as an export document.
pub fn store_export<B: StorageBackend>(store: &SettingsStore<B>) -> Result<ExportDocument> {
    Ok(ExportDocument {
        version: EXPORT_VERSION,
        exported_at: Utc::now(),
        settings: store.settings(&SettingFilter::All)?,
    })
}

/// Result of writing an export document to a file.
#[derive(Debug, Serialize)]
pub struct ExportWritten {
    pub path: PathBuf,
    pub count: usize,
}

impl Output for ExportWritten {
    fn to_json(&self) -> String {
        json_line(self)
    }

    fn to_human(&self) -> String {
        format!("Exported {} settings to {}", self.count, self.path.display())
    }
}

/// Write an export document to `path`.
pub fn write_export(document: &ExportDocument, path: &Path) -> Result<ExportWritten> {
    fs::write(path, document.to_json())?;
    Ok(ExportWritten {
        path: path.to_path_buf(),
        count: document.settings.len(),
    })
}

#[derive(Debug, Deserialize)]
struct ImportDocument {
    #[serde(default)]
    version: Option<u32>,
    settings: Vec<ImportEntry>,
}

#[derive(Debug, Deserialize)]
struct ImportEntry {
    key: String,
    #[serde(rename = "type", default)]
    setting_type: SettingType,
    value: serde_json::Value,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl ImportEntry {
    fn into_setting(self) -> Result<Setting> {
        validate_key(&self.key)?;
        validate_category(self.category.as_deref())?;
        let value = SettingValue::from_typed_json(self.setting_type, self.value).ok_or_else(|| {
            Error::InvalidInput(format!(
                "Value of '{}' does not match its type {}",
                self.key, self.setting_type
            ))
        })?;
        let mut setting = Setting::new(self.key, value, self.category);
        if let Some(created_at) = self.created_at {
            setting.created_at = created_at;
        }
        if let Some(updated_at) = self.updated_at {
            setting.updated_at = updated_at;
        }
        Ok(setting)
    }
}

/// Result of `qm import`.
#[derive(Debug, Serialize)]
pub struct ImportResult {
    pub imported: usize,
    pub skipped: Vec<String>,
}

impl Output for ImportResult {
    fn to_json(&self) -> String {
        json_line(self)
    }

    fn to_human(&self) -> String {
        let mut out = format!("Imported {} settings", self.imported);
        if !self.skipped.is_empty() {
            out.push_str(&format!(
                ", skipped {} existing: {}",
                self.skipped.len(),
                self.skipped.join(", ")
            ));
        }
        out
    }
}

/// Load settings from an export document.
///
/// The whole document is validated before anything is written. Existing
/// keys are skipped unless `overwrite` is set.
pub fn store_import<B: StorageBackend>(
    store: &mut SettingsStore<B>,
    content: &str,
    overwrite: bool,
) -> Result<ImportResult> {
    let document: ImportDocument = serde_json::from_str(content)
        .map_err(|e| Error::InvalidInput(format!("Not an export document: {}", e)))?;

    if let Some(version) = document.version {
        if version > EXPORT_VERSION {
            return Err(Error::InvalidInput(format!(
                "Unsupported export version {} (newest supported: {})",
                version, EXPORT_VERSION
            )));
        }
    }

    let settings = document
        .settings
        .into_iter()
        .map(ImportEntry::into_setting)
        .collect::<Result<Vec<_>>>()?;

    let mut result = ImportResult {
        imported: 0,
        skipped: Vec::new(),
    };
    for setting in settings {
        let key = setting.key.clone();
        if store.import(setting, overwrite)? {
            result.imported += 1;
        } else {
            result.skipped.push(key);
        }
    }
    Ok(result)
}

// === config ===

/// A resolved preference with its source, for display.
#[derive(Debug, Serialize)]
pub struct ConfigEntry {
    pub value: String,
    pub source: String,
}

impl ConfigEntry {
    fn new(value: impl ToString, source: impl ToString) -> Self {
        Self {
            value: value.to_string(),
            source: source.to_string(),
        }
    }
}

/// Result of `qm config show`.
#[derive(Debug, Serialize)]
pub struct ConfigShow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_path: Option<PathBuf>,
    pub output_format: ConfigEntry,
    pub store: ConfigEntry,
    /// Backend selected by the store location
    pub backend: BackendType,
    pub strict: ConfigEntry,
    pub default_type: ConfigEntry,
}

impl Output for ConfigShow {
    fn to_json(&self) -> String {
        json_line(self)
    }

    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        if let Some(ref path) = self.config_path {
            lines.push(format!("config file:   {}", path.display()));
        }
        for (name, entry) in [
            ("output-format", &self.output_format),
            ("store", &self.store),
            ("strict", &self.strict),
            ("default-type", &self.default_type),
        ] {
            lines.push(format!("{:<14} {} ({})", format!("{}:", name), entry.value, entry.source));
            if name == "store" {
                lines.push(format!("{:<14} {}", "backend:", self.backend));
            }
        }
        lines.join("\n")
    }
}

/// Show the resolved preferences and where each came from.
pub fn config_show(resolved: &ResolvedConfig) -> ConfigShow {
    ConfigShow {
        config_path: resolved.config_path.clone(),
        output_format: ConfigEntry::new(resolved.output_format(), &resolved.output_format.source),
        store: ConfigEntry::new(resolved.store().display(), &resolved.store.source),
        backend: BackendType::for_location(resolved.store()),
        strict: ConfigEntry::new(resolved.strict(), &resolved.strict.source),
        default_type: ConfigEntry::new(resolved.default_type(), &resolved.default_type.source),
    }
}

/// Result of `qm config init`.
#[derive(Debug, Serialize)]
pub struct ConfigInit {
    pub path: PathBuf,
    pub created: bool,
}

impl Output for ConfigInit {
    fn to_json(&self) -> String {
        json_line(self)
    }

    fn to_human(&self) -> String {
        if self.created {
            format!("Wrote {}", self.path.display())
        } else {
            format!("{} already exists", self.path.display())
        }
    }
}

/// Write a config file holding the preferences chosen on the command line
/// or already present in the config file.
///
/// Environment values and built-in defaults are left out so they keep
/// following `QM_DATA_DIR` and friends. A `:memory:` store given on the
/// command line is refused. An existing file is left alone unless `force`
/// is set.
pub fn config_init(path: &Path, resolved: &ResolvedConfig, force: bool) -> Result<ConfigInit> {
    if path.exists() && !force {
        return Ok(ConfigInit {
            path: path.to_path_buf(),
            created: false,
        });
    }

    if resolved.store.source == ValueSource::CliFlag
        && BackendType::for_location(resolved.store()) == BackendType::Memory
    {
        return Err(Error::InvalidInput(format!(
            "Refusing to save the throwaway store '{}' as a preference",
            resolved.store().display()
        )));
    }

    let config = QuartermasterConfig {
        output_format: resolved.output_format.persistable().cloned(),
        store: resolved.store.persistable().cloned(),
        strict: resolved.strict.persistable().copied(),
        default_type: resolved.default_type.persistable().copied(),
    };
    write_config(path, &config)?;
    tracing::info!(path = %path.display(), "config file written");
    Ok(ConfigInit {
        path: path.to_path_buf(),
        created: true,
    })
}
