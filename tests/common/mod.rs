//! Common test utilities for taskwell integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't pollute
//! the user's `~/.local/share/taskwell/` or `~/.config/taskwell/`.

#![allow(dead_code)]

use assert_cmd::Command;
pub use tempfile::TempDir;

/// A test environment with isolated data storage.
///
/// Each `TestEnv` creates three temporary directories:
/// - `repo_dir`: The working directory commands run in
/// - `data_dir`: Holds taskwell's records (via `TW_DATA_DIR`)
/// - `config_dir`: Holds the system config (via `TW_CONFIG_DIR`)
///
/// The `tw()` method returns a `Command` that sets these per-invocation,
/// making tests parallel-safe.
pub struct TestEnv {
    pub repo_dir: TempDir,
    pub data_dir: TempDir,
    pub config_dir: TempDir,
}

impl TestEnv {
    /// Create a new test environment with isolated directories.
    pub fn new() -> Self {
        Self {
            repo_dir: TempDir::new().unwrap(),
            data_dir: TempDir::new().unwrap(),
            config_dir: TempDir::new().unwrap(),
        }
    }

    /// Get a Command for the tw binary with isolated data and config directories.
    pub fn tw(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_tw"));
        cmd.current_dir(self.repo_dir.path());
        cmd.env("TW_DATA_DIR", self.data_dir.path());
        cmd.env("TW_CONFIG_DIR", self.config_dir.path());
        cmd.env_remove("TW_DIR");
        cmd.env_remove("TW_LOG");
        cmd
    }

    /// Get the path to the working directory.
    pub fn repo_path(&self) -> &std::path::Path {
        self.repo_dir.path()
    }

    /// Get the path to the data directory.
    pub fn data_path(&self) -> &std::path::Path {
        self.data_dir.path()
    }

    /// Run a command expected to succeed and parse its JSON output.
    pub fn tw_json(&self, args: &[&str]) -> serde_json::Value {
        let output = self.tw().args(args).output().unwrap();
        assert!(
            output.status.success(),
            "tw {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).unwrap()
    }

    /// Create a project and return its ID.
    pub fn create_project(&self, name: &str) -> String {
        let json = self.tw_json(&["project", "create", name]);
        json["id"].as_str().unwrap().to_string()
    }

    /// Create a task and return its ID.
    pub fn create_task(&self, project_id: &str, name: &str, details: &str) -> String {
        let json = self.tw_json(&["task", "create", name, "-p", project_id, "-d", details]);
        json["id"].as_str().unwrap().to_string()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
