//! User preferences for Quartermaster.
//!
//! Preferences live in `config.kdl`, located at
//! `~/.config/quartermaster/config.kdl` (or the path in `QM_CONFIG`).
//!
//! Contains:
//! - `output-format` - "json" or "human"
//! - `store` - Settings store location (`:memory:` for a throwaway store)
//! - `strict` - Reject malformed input instead of storing fallback values
//! - `default-type` - Type for new settings created without `--type`
//!
//! ## Precedence
//!
//! CLI flag > environment variable > config.kdl > defaults
//!
//! Use the [`resolver`] module for unified precedence resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{
    CONFIG_ENV, ConfigOverrides, OUTPUT_ENV, Resolved, ResolvedConfig, STORE_ENV, ValueSource,
    config_path, read_config, resolve_config, write_config,
};
pub use schema::{OutputFormat, QuartermasterConfig};
