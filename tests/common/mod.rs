//! Common test utilities for quartermaster integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't pollute
//! the user's `~/.local/share/quartermaster/` or `~/.config/quartermaster/`.

#![allow(dead_code)]

use assert_cmd::Command;
pub use tempfile::TempDir;

/// A test environment with isolated data and config.
///
/// The `qm()` method returns a `Command` that sets `QM_DATA_DIR` and
/// `QM_CONFIG` per-invocation, making tests parallel-safe.
pub struct TestEnv {
    pub data_dir: TempDir,
}

impl TestEnv {
    /// Create a new test environment with an isolated directory.
    pub fn new() -> Self {
        Self {
            data_dir: TempDir::new().unwrap(),
        }
    }

    /// Get a Command for the qm binary with isolated data and config.
    pub fn qm(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_qm"));
        cmd.current_dir(self.data_dir.path());
        cmd.env("QM_DATA_DIR", self.data_dir.path());
        cmd.env("QM_CONFIG", self.config_path());
        cmd.env_remove("QM_STORE");
        cmd.env_remove("QM_OUTPUT");
        cmd.env_remove("QM_LOG");
        cmd
    }

    /// Get the path to the data directory.
    pub fn data_path(&self) -> &std::path::Path {
        self.data_dir.path()
    }

    /// Path of the settings database used by default.
    pub fn db_path(&self) -> std::path::PathBuf {
        self.data_path().join("settings.db")
    }

    /// Path of the config file used by `qm()` commands.
    pub fn config_path(&self) -> std::path::PathBuf {
        self.data_path().join("config.kdl")
    }

    /// Run `qm` with the given args, assert success, and parse stdout as JSON.
    pub fn json(&self, args: &[&str]) -> serde_json::Value {
        let output = self.qm().args(args).output().unwrap();
        assert!(
            output.status.success(),
            "qm {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).unwrap()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
