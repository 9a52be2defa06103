//! Precedence resolution for user preferences.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI flags (passed at runtime)
//! 2. Environment variables (`QM_STORE`, `QM_OUTPUT`)
//! 3. config.kdl (`~/.config/quartermaster/config.kdl`, or `QM_CONFIG`)
//! 4. Built-in defaults

use kdl::KdlDocument;
use std::fs;
use std::path::{Path, PathBuf};

use super::schema::{OutputFormat, QuartermasterConfig};
use crate::models::SettingType;
use crate::storage::default_store_path;
use crate::{Error, Result};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "QM_CONFIG";

/// Environment variable naming the store location.
pub const STORE_ENV: &str = "QM_STORE";

/// Environment variable selecting the output format.
pub const OUTPUT_ENV: &str = "QM_OUTPUT";

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from environment variable
    EnvVar(String),
    /// Value from a config file
    ConfigFile(String),
    /// Value from CLI flag
    CliFlag,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::ConfigFile(path) => write!(f, "config:{}", path),
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone)]
pub struct Resolved<T> {
    /// The resolved value
    pub value: T,
    /// Where the value came from
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    /// Create a new resolved value.
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }

    /// The value when it was chosen on the command line or in the config
    /// file. Environment values and built-in defaults yield `None`.
    pub fn persistable(&self) -> Option<&T> {
        match self.source {
            ValueSource::CliFlag | ValueSource::ConfigFile(_) => Some(&self.value),
            ValueSource::EnvVar(_) | ValueSource::Default => None,
        }
    }
}

/// Fully resolved preferences with source tracking.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Config file that was consulted (it may not exist)
    pub config_path: Option<PathBuf>,
    /// Output format preference
    pub output_format: Resolved<OutputFormat>,
    /// Store location
    pub store: Resolved<PathBuf>,
    /// Strict decoding
    pub strict: Resolved<bool>,
    /// Type for new settings created without an explicit type
    pub default_type: Resolved<SettingType>,
}

impl ResolvedConfig {
    /// Get the output format value.
    pub fn output_format(&self) -> &OutputFormat {
        &self.output_format.value
    }

    /// Get the store location.
    pub fn store(&self) -> &Path {
        &self.store.value
    }

    /// Whether strict decoding is enabled.
    pub fn strict(&self) -> bool {
        self.strict.value
    }

    /// Get the default type for new settings.
    pub fn default_type(&self) -> SettingType {
        self.default_type.value
    }
}

/// CLI overrides for configuration resolution.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Config file path from CLI flag
    pub config_path: Option<PathBuf>,
    /// Output format override from CLI flag
    pub output_format: Option<OutputFormat>,
    /// Store location override from CLI flag
    pub store: Option<PathBuf>,
    /// Strict decoding override from CLI flag
    pub strict: Option<bool>,
}

impl ConfigOverrides {
    /// Create empty overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set config file override.
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Set output format override.
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    /// Set store location override.
    pub fn with_store(mut self, store: impl Into<PathBuf>) -> Self {
        self.store = Some(store.into());
        self
    }

    /// Set strict decoding override.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = Some(strict);
        self
    }
}

/// Non-empty value of an environment variable.
fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Locate the config file: CLI flag > `QM_CONFIG` > platform config dir.
pub fn config_path(overrides: &ConfigOverrides) -> Option<PathBuf> {
    if let Some(ref path) = overrides.config_path {
        return Some(path.clone());
    }
    if let Some(path) = env_value(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join("quartermaster").join("config.kdl"))
}

/// Read config.kdl from `path`. A missing file yields an empty config.
pub fn read_config(path: &Path) -> Result<QuartermasterConfig> {
    if !path.exists() {
        return Ok(QuartermasterConfig::default());
    }

    let content = fs::read_to_string(path)?;
    let doc: KdlDocument = content
        .parse()
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
    Ok(QuartermasterConfig::from_kdl(&doc))
}

/// Write `config` to `path`, creating parent directories.
pub fn write_config(path: &Path, config: &QuartermasterConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut doc = config.to_kdl();
    doc.autoformat();
    fs::write(path, doc.to_string())?;
    Ok(())
}

/// Resolve preferences with the full precedence chain.
pub fn resolve_config(overrides: &ConfigOverrides) -> Result<ResolvedConfig> {
    let config_path = config_path(overrides);
    let file_config = match config_path {
        Some(ref path) => read_config(path)?,
        None => QuartermasterConfig::default(),
    };
    let file_source = || {
        ValueSource::ConfigFile(
            config_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        )
    };

    // Resolve output_format
    let output_format = if let Some(ref format) = overrides.output_format {
        Resolved::new(format.clone(), ValueSource::CliFlag)
    } else if let Some(format) = env_value(OUTPUT_ENV).and_then(|v| OutputFormat::parse(&v)) {
        Resolved::new(format, ValueSource::EnvVar(OUTPUT_ENV.to_string()))
    } else if let Some(ref format) = file_config.output_format {
        Resolved::new(format.clone(), file_source())
    } else {
        Resolved::new(OutputFormat::default(), ValueSource::Default)
    };

    // Resolve store
    let store = if let Some(ref store) = overrides.store {
        Resolved::new(store.clone(), ValueSource::CliFlag)
    } else if let Some(store) = env_value(STORE_ENV) {
        Resolved::new(PathBuf::from(store), ValueSource::EnvVar(STORE_ENV.to_string()))
    } else if let Some(ref store) = file_config.store {
        Resolved::new(store.clone(), file_source())
    } else {
        Resolved::new(default_store_path()?, ValueSource::Default)
    };

    // Resolve strict
    let strict = if let Some(strict) = overrides.strict {
        Resolved::new(strict, ValueSource::CliFlag)
    } else if let Some(strict) = file_config.strict {
        Resolved::new(strict, file_source())
    } else {
        Resolved::new(false, ValueSource::Default)
    };

    // Resolve default_type
    let default_type = match file_config.default_type {
        Some(default_type) => Resolved::new(default_type, file_source()),
        None => Resolved::new(SettingType::default(), ValueSource::Default),
    };

    Ok(ResolvedConfig {
        config_path,
        output_format,
        store,
        strict,
        default_type,
    })
}
