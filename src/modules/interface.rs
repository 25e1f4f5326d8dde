//! Module interface traits and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified interface for all playbook modules
///
/// A module owns the result lines it produces. The runner drains them after
/// each dispatch, so a module instance can be shared through the registry
/// while still collecting its own results.
#[async_trait]
pub trait PlayModule: Send + Sync {
    /// Module name (e.g., "file", "shell")
    fn name(&self) -> &'static str;

    /// Execute every task of a YAML list written in this module's schema
    async fn run_all(&self, task_list: &str);

    /// Execute a single task given as one YAML mapping
    async fn run_one(&self, task: &str);

    /// Record the outcome of one executed task
    async fn collect_result(&self, result: ResPlayBook);

    /// Remove and return every result recorded so far
    async fn drain_results(&self) -> Vec<ResPlayBook>;
}

/// Outcome of a single task step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayStatus {
    Success,
    Fail,
    Unknown,
}

impl PlayStatus {
    pub fn code(&self) -> i8 {
        match self {
            PlayStatus::Success => 0,
            PlayStatus::Fail => -1,
            PlayStatus::Unknown => 1,
        }
    }
}

impl From<i8> for PlayStatus {
    fn from(code: i8) -> Self {
        match code {
            0 => PlayStatus::Success,
            -1 => PlayStatus::Fail,
            _ => PlayStatus::Unknown,
        }
    }
}

impl fmt::Display for PlayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PlayStatus::Success => "success",
            PlayStatus::Fail => "fail",
            PlayStatus::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// Result record produced by a module after executing one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResPlayBook {
    pub name: String,
    pub model: String,
    pub msg: String,
    pub status: PlayStatus,
}

impl ResPlayBook {
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        msg: impl Into<String>,
        status: PlayStatus,
    ) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            msg: msg.into(),
            status,
        }
    }

    pub fn success(name: impl Into<String>, model: &str, msg: impl Into<String>) -> Self {
        Self::new(name, model, msg, PlayStatus::Success)
    }

    pub fn fail(name: impl Into<String>, model: &str, msg: impl Into<String>) -> Self {
        Self::new(name, model, msg, PlayStatus::Fail)
    }
}

impl fmt::Display for ResPlayBook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "step name:{}, module:{}, result:{}, {}",
            self.name, self.model, self.status, self.msg
        )
    }
}
