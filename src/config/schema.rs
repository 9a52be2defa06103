//! KDL schema definition for config.kdl.
//!
//! This module provides:
//! - Rust structs representing the KDL schema
//! - Serialization/deserialization to/from KDL format
//! - Merging of partial configs

use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::models::SettingType;

/// Output format preference for CLI commands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON output (default, machine-readable)
    #[default]
    Json,
    /// Human-readable output
    Human,
}

impl OutputFormat {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "human" => Some(OutputFormat::Human),
            _ => None,
        }
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Human => "human",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// User preferences stored in config.kdl.
///
/// # KDL Schema
///
/// ```kdl
/// output-format "human"  // or "json"
/// store "/home/me/.local/share/quartermaster/settings.db"
/// strict #true
/// default-type "string"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuartermasterConfig {
    /// Default output format for CLI commands
    pub output_format: Option<OutputFormat>,

    /// Settings store location (`:memory:` for a throwaway store)
    pub store: Option<PathBuf>,

    /// Reject malformed input instead of storing fallback values
    pub strict: Option<bool>,

    /// Type for new settings created without `--type`
    pub default_type: Option<SettingType>,
}

/// First argument of a node as a string, if the node exists.
fn first_string<'a>(doc: &'a KdlDocument, name: &str) -> Option<&'a str> {
    doc.get(name)
        .and_then(|node| node.entries().first())
        .and_then(|entry| entry.value().as_string())
}

impl QuartermasterConfig {
    /// Create an empty config with no values set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse config from a KDL document.
    ///
    /// Unknown or malformed entries are skipped with a warning.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        let mut config = Self::new();

        if let Some(s) = first_string(doc, "output-format") {
            config.output_format = OutputFormat::parse(s);
            if config.output_format.is_none() {
                tracing::warn!(value = s, "ignoring invalid output-format in config");
            }
        }

        if let Some(s) = first_string(doc, "store") {
            if s.is_empty() {
                tracing::warn!("ignoring empty store in config");
            } else {
                config.store = Some(PathBuf::from(s));
            }
        }

        if let Some(node) = doc.get("strict") {
            match node.entries().first().and_then(|e| e.value().as_bool()) {
                Some(b) => config.strict = Some(b),
                None => tracing::warn!("ignoring non-boolean strict in config"),
            }
        }

        if let Some(s) = first_string(doc, "default-type") {
            config.default_type = SettingType::parse(s);
            if config.default_type.is_none() {
                tracing::warn!(value = s, "ignoring invalid default-type in config");
            }
        }

        config
    }

    /// Convert config to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        if let Some(ref format) = self.output_format {
            let mut node = KdlNode::new("output-format");
            node.push(KdlEntry::new(KdlValue::String(format.as_str().to_string())));
            doc.nodes_mut().push(node);
        }

        if let Some(ref store) = self.store {
            let mut node = KdlNode::new("store");
            node.push(KdlEntry::new(KdlValue::String(store.display().to_string())));
            doc.nodes_mut().push(node);
        }

        if let Some(strict) = self.strict {
            let mut node = KdlNode::new("strict");
            node.push(KdlEntry::new(KdlValue::Bool(strict)));
            doc.nodes_mut().push(node);
        }

        if let Some(default_type) = self.default_type {
            let mut node = KdlNode::new("default-type");
            node.push(KdlEntry::new(KdlValue::String(default_type.as_str().to_string())));
            doc.nodes_mut().push(node);
        }

        doc
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` if they are Some.
    pub fn merge(&mut self, other: &QuartermasterConfig) {
        if other.output_format.is_some() {
            self.output_format = other.output_format.clone();
        }
        if other.store.is_some() {
            self.store = other.store.clone();
        }
        if other.strict.is_some() {
            self.strict = other.strict;
        }
        if other.default_type.is_some() {
            self.default_type = other.default_type;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::parse("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("JSON"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("human"), Some(OutputFormat::Human));
        assert_eq!(OutputFormat::parse("invalid"), None);
    }

    #[test]
    fn test_output_format_display() {
        assert_eq!(format!("{}", OutputFormat::Json), "json");
        assert_eq!(format!("{}", OutputFormat::Human), "human");
    }

    #[test]
    fn test_config_from_kdl_empty() {
        let doc = KdlDocument::new();
        let config = QuartermasterConfig::from_kdl(&doc);
        assert_eq!(config, QuartermasterConfig::default());
    }

    #[test]
    fn test_config_from_kdl_full() {
        let kdl = r#"
            output-format "human"
            store "/tmp/qm/settings.db"
            strict #true
            default-type "json"
        "#;
        let doc: KdlDocument = kdl.parse().unwrap();
        let config = QuartermasterConfig::from_kdl(&doc);

        assert_eq!(config.output_format, Some(OutputFormat::Human));
        assert_eq!(config.store, Some(PathBuf::from("/tmp/qm/settings.db")));
        assert_eq!(config.strict, Some(true));
        assert_eq!(config.default_type, Some(SettingType::Json));
    }

    #[test]
    fn test_config_from_kdl_skips_invalid_values() {
        let kdl = r#"
            output-format "yaml"
            strict "sometimes"
            default-type "float"
        "#;
        let doc: KdlDocument = kdl.parse().unwrap();
        let config = QuartermasterConfig::from_kdl(&doc);

        assert_eq!(config, QuartermasterConfig::default());
    }

    #[test]
    fn test_config_to_kdl_roundtrip() {
        let config = QuartermasterConfig {
            output_format: Some(OutputFormat::Human),
            store: Some(PathBuf::from(":memory:")),
            strict: Some(false),
            default_type: Some(SettingType::Integer),
        };

        let doc = config.to_kdl();
        let parsed = QuartermasterConfig::from_kdl(&doc);

        assert_eq!(config, parsed);
    }

    #[test]
    fn test_config_merge() {
        let mut base = QuartermasterConfig {
            output_format: Some(OutputFormat::Json),
            strict: Some(false),
            ..Default::default()
        };
        let other = QuartermasterConfig {
            strict: Some(true),
            default_type: Some(SettingType::Boolean),
            ..Default::default()
        };

        base.merge(&other);

        assert_eq!(base.output_format, Some(OutputFormat::Json));
        assert_eq!(base.strict, Some(true));
        assert_eq!(base.default_type, Some(SettingType::Boolean));
        assert_eq!(base.store, None);
    }
}
