//! Runner configuration

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::modules::core::ShellDefaults;
use crate::runtime::error::RunnerError;

/// Configuration for a playbook run, optionally loaded from a YAML file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub log_level: String,
    pub shell: ShellDefaults,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            shell: ShellDefaults::default(),
        }
    }
}

impl RunnerConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self, RunnerError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| RunnerError::InvalidConfig {
            reason: e.to_string(),
        })
    }

    pub async fn load(path: &Path) -> Result<Self, RunnerError> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_yaml_str(&content)
    }

    /// Tracing level for `log_level`, falling back to INFO
    pub fn tracing_level(&self) -> tracing::Level {
        self.log_level.parse().unwrap_or(tracing::Level::INFO)
    }
}
