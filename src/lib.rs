//! Quartermaster - A typed, categorized settings store.
//!
//! This library provides the core functionality for the `qm` CLI tool:
//! the typed settings store, its record-store backends, and the command
//! layer that the binary dispatches into.

pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;
pub mod models;
pub mod storage;


/// Library-level error type for Quartermaster operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Setting not found: {0}")]
    NotFound(String),

    #[error("Setting already exists: {0}")]
    AlreadyExists(String),

    #[error("Cannot decode {input:?} as {expected} for setting {key}")]
    Decode {
        key: String,
        expected: models::SettingType,
        input: String,
    },

    #[error("Corrupt record for setting {key}: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Aborted")]
    Aborted,

    #[error("{0}")]
    Other(String),
}

/// Result type alias for Quartermaster operations.
pub type Result<T> = std::result::Result<T, Error>;
