//! Shared helpers for integration tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use nix::unistd::{getgid, getuid};
use rustle_play::modules::core::ShellDefaults;
use rustle_play::modules::{ModuleRegistry, ResPlayBook};
use rustle_play::runtime::TaskRunner;
use tempfile::{tempdir, TempDir};

/// Isolated scratch directory plus a registry whose shell tasks run as the
/// invoking user, so tests pass without root
pub struct TestEnvironment {
    temp_dir: TempDir,
    registry: ModuleRegistry,
}

impl TestEnvironment {
    pub fn new() -> Self {
        Self::with_timeout(10)
    }

    pub fn with_timeout(timeout: u64) -> Self {
        let temp_dir = tempdir().expect("Failed to create temporary directory");
        let registry = ModuleRegistry::with_shell_defaults(current_identity(timeout));
        Self { temp_dir, registry }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn temp_path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// `temp_path` as a string for embedding in YAML
    pub fn temp_str(&self, name: &str) -> String {
        self.temp_path(name).to_string_lossy().into_owned()
    }

    pub fn create_test_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.temp_path(name);
        std::fs::write(&path, content).expect("Failed to write test file");
        path
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub async fn run(&self, playbook: &str) -> Vec<String> {
        TaskRunner::new(&self.registry)
            .run(playbook)
            .await
            .expect("playbook should parse")
    }

    pub async fn run_records(&self, playbook: &str) -> Vec<ResPlayBook> {
        TaskRunner::new(&self.registry)
            .run_records(playbook)
            .await
            .expect("playbook should parse")
    }
}

impl Default for TestEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

pub fn current_identity(timeout: u64) -> ShellDefaults {
    ShellDefaults {
        timeout,
        user: getuid().to_string(),
        group: getgid().to_string(),
    }
}

pub fn assert_file_exists(path: &Path) {
    assert!(path.exists(), "File should exist: {}", path.display());
}

pub fn assert_file_not_exists(path: &Path) {
    assert!(
        std::fs::symlink_metadata(path).is_err(),
        "File should not exist: {}",
        path.display()
    );
}
