//! Data models for Quartermaster settings.
//!
//! This module defines the core data structures:
//! - `SettingType` - The fixed type tag of a setting
//! - `SettingValue` - A decoded, typed value
//! - `Setting` - A named, typed, optionally categorized value
//! - `SettingRecord` - The untyped form handed to storage backends

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

/// Type tag of a setting.
///
/// The tag is chosen when a setting is created and never changes afterwards;
/// every later write decodes its raw input through the stored tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingType {
    #[default]
    String,
    Integer,
    Boolean,
    Json,
}

/// Result of decoding a raw string through a type tag.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    /// The decoded value (a substitute value when `lossy` is set)
    pub value: SettingValue,
    /// True when the input was not valid for the type and a fallback was used
    pub lossy: bool,
}

impl SettingType {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "string" | "str" => Some(SettingType::String),
            "integer" | "int" => Some(SettingType::Integer),
            "boolean" | "bool" => Some(SettingType::Boolean),
            "json" => Some(SettingType::Json),
            _ => None,
        }
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingType::String => "string",
            SettingType::Integer => "integer",
            SettingType::Boolean => "boolean",
            SettingType::Json => "json",
        }
    }

    /// Decode a raw string input through this type.
    ///
    /// Malformed input never fails here: integers fall back to their leading
    /// numeric prefix (or 0), unrecognized booleans to false, malformed JSON
    /// to null. The `lossy` flag reports whether such a fallback happened.
    pub fn decode(&self, raw: &str) -> Decoded {
        match self {
            SettingType::String => Decoded {
                value: SettingValue::String(raw.to_string()),
                lossy: false,
            },
            SettingType::Integer => {
                let (value, lossy) = decode_integer(raw);
                Decoded {
                    value: SettingValue::Integer(value),
                    lossy,
                }
            }
            SettingType::Boolean => {
                let (value, lossy) = match decode_boolean(raw) {
                    Some(b) => (b, false),
                    None => (false, true),
                };
                Decoded {
                    value: SettingValue::Boolean(value),
                    lossy,
                }
            }
            SettingType::Json => match serde_json::from_str::<serde_json::Value>(raw) {
                Ok(v) => Decoded {
                    value: SettingValue::Json(v),
                    lossy: false,
                },
                Err(_) => Decoded {
                    value: SettingValue::Json(serde_json::Value::Null),
                    lossy: true,
                },
            },
        }
    }
}

impl fmt::Display for SettingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SettingType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        SettingType::parse(s).ok_or_else(|| {
            Error::InvalidInput(format!(
                "Unknown setting type '{}' (expected string, integer, boolean or json)",
                s
            ))
        })
    }
}

/// Decode an integer the way a loose numeric cast does.
///
/// Leading whitespace is skipped, an optional sign and the longest run of
/// ASCII digits are taken, and anything after is ignored. Input with no
/// digits yields 0. Out-of-range values saturate.
fn decode_integer(raw: &str) -> (i64, bool) {
    let trimmed = raw.trim();
    if let Ok(n) = trimmed.parse::<i64>() {
        return (n, false);
    }

    let bytes = trimmed.as_bytes();
    let mut idx = 0;
    let negative = match bytes.first() {
        Some(b'-') => {
            idx = 1;
            true
        }
        Some(b'+') => {
            idx = 1;
            false
        }
        _ => false,
    };

    let digits_start = idx;
    while idx < bytes.len() && bytes[idx].is_ascii_digit() {
        idx += 1;
    }
    let digits = &trimmed[digits_start..idx];
    if digits.is_empty() {
        return (0, true);
    }

    let mut value: i64 = 0;
    for d in digits.bytes() {
        let digit = i64::from(d - b'0');
        value = match value
            .checked_mul(10)
            .and_then(|v| if negative { v.checked_sub(digit) } else { v.checked_add(digit) })
        {
            Some(v) => v,
            None => return (if negative { i64::MIN } else { i64::MAX }, true),
        };
    }
    (value, true)
}

/// Recognize a boolean token. Returns `None` for unrecognized input.
fn decode_boolean(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// A decoded, typed setting value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SettingValue {
    String(String),
    Integer(i64),
    Boolean(bool),
    Json(serde_json::Value),
}

impl SettingValue {
    /// The type tag matching this value's variant.
    pub fn setting_type(&self) -> SettingType {
        match self {
            SettingValue::String(_) => SettingType::String,
            SettingValue::Integer(_) => SettingType::Integer,
            SettingValue::Boolean(_) => SettingType::Boolean,
            SettingValue::Json(_) => SettingType::Json,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SettingValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            SettingValue::Json(v) => Some(v),
            _ => None,
        }
    }

    /// Convert to a JSON value for machine-readable output.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            SettingValue::String(s) => serde_json::Value::String(s.clone()),
            SettingValue::Integer(n) => serde_json::Value::from(*n),
            SettingValue::Boolean(b) => serde_json::Value::Bool(*b),
            SettingValue::Json(v) => v.clone(),
        }
    }

    /// Build a value of the given type from a JSON value, as found in an
    /// export document. Returns `None` when the JSON shape does not match.
    pub fn from_typed_json(setting_type: SettingType, value: serde_json::Value) -> Option<Self> {
        match (setting_type, value) {
            (SettingType::String, serde_json::Value::String(s)) => Some(SettingValue::String(s)),
            (SettingType::Integer, v) => v.as_i64().map(SettingValue::Integer),
            (SettingType::Boolean, serde_json::Value::Bool(b)) => Some(SettingValue::Boolean(b)),
            (SettingType::Json, v) => Some(SettingValue::Json(v)),
            _ => None,
        }
    }
}

/// Display form: strings and integers render literally, booleans as
/// `true`/`false`, JSON as compact JSON text.
impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::String(s) => write!(f, "{}", s),
            SettingValue::Integer(n) => write!(f, "{}", n),
            SettingValue::Boolean(b) => write!(f, "{}", b),
            SettingValue::Json(v) => write!(f, "{}", v),
        }
    }
}

/// A named, typed, optionally categorized configuration value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Setting {
    /// Unique key (e.g., "mail.port")
    pub key: String,

    /// Fixed type tag
    #[serde(rename = "type")]
    pub setting_type: SettingType,

    /// Decoded value
    pub value: SettingValue,

    /// Optional grouping label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Setting {
    /// Create a new setting. The type tag is taken from the value.
    pub fn new(key: String, value: SettingValue, category: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            key,
            setting_type: value.setting_type(),
            value,
            category,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check whether this setting belongs to the given category.
    pub fn in_category(&self, name: &str) -> bool {
        self.category.as_deref() == Some(name)
    }

    /// Convert to the untyped record form used by storage backends.
    pub fn to_record(&self) -> SettingRecord {
        SettingRecord {
            key: self.key.clone(),
            setting_type: self.setting_type.as_str().to_string(),
            value: self.value.to_string(),
            category: self.category.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Rebuild a setting from a stored record.
    ///
    /// Stored values were written in display form, so they are decoded
    /// strictly: any fallback here means the record was damaged.
    pub fn from_record(record: SettingRecord) -> Result<Self> {
        let setting_type =
            SettingType::parse(&record.setting_type).ok_or_else(|| Error::Corrupt {
                key: record.key.clone(),
                reason: format!("unknown type tag '{}'", record.setting_type),
            })?;

        let decoded = setting_type.decode(&record.value);
        if decoded.lossy {
            return Err(Error::Corrupt {
                key: record.key,
                reason: format!("value {:?} is not a valid {}", record.value, setting_type),
            });
        }

        Ok(Self {
            key: record.key,
            setting_type,
            value: decoded.value,
            category: record.category,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

/// Untyped persisted form of a setting.
///
/// Backends store and return records verbatim and never interpret `value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingRecord {
    pub key: String,
    #[serde(rename = "type")]
    pub setting_type: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
