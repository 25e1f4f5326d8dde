//! Task runner: splits a playbook into tasks and dispatches each one to its
//! module in document order.

use serde_yaml::{Mapping, Value};
use tracing::{debug, info, warn};

use crate::modules::error::{ModuleError, ValidationError};
use crate::modules::interface::{PlayStatus, ResPlayBook};
use crate::modules::registry::ModuleRegistry;
use crate::runtime::error::RunnerError;

/// Model reported for tasks that could not be routed to any module
pub const UNKNOWN_MODEL: &str = "unknown";

/// Where a task is routed, decided by its module key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRoute {
    Module(&'static str),
    /// Recognised module with no runner support yet
    Skip(&'static str),
}

impl TaskRoute {
    fn from_key(key: &str) -> Option<Self> {
        match key {
            "file" => Some(TaskRoute::Module("file")),
            "shell" | "command" => Some(TaskRoute::Module("shell")),
            "copy" => Some(TaskRoute::Skip("copy")),
            "template" => Some(TaskRoute::Skip("template")),
            _ => None,
        }
    }

    /// Route of a task mapping, from the first key that names a module
    pub fn of(task: &Mapping) -> Option<Self> {
        task.keys()
            .filter_map(Value::as_str)
            .find_map(TaskRoute::from_key)
    }
}

/// Runs task lists against a shared module registry
pub struct TaskRunner<'a> {
    registry: &'a ModuleRegistry,
}

impl<'a> TaskRunner<'a> {
    pub fn new(registry: &'a ModuleRegistry) -> Self {
        Self { registry }
    }

    /// Run a playbook and return one formatted line per executed task
    pub async fn run(&self, playbook: &str) -> Result<Vec<String>, RunnerError> {
        let records = self.run_records(playbook).await?;
        Ok(records.iter().map(ToString::to_string).collect())
    }

    /// Run a playbook and return the result records.
    ///
    /// Only an unparsable document is an error; every per-task failure is
    /// reported as a failed record and the run continues.
    pub async fn run_records(&self, playbook: &str) -> Result<Vec<ResPlayBook>, RunnerError> {
        if playbook.trim().is_empty() {
            return Ok(Vec::new());
        }

        let tasks: Option<Vec<Value>> = serde_yaml::from_str(playbook)?;
        let tasks = tasks.unwrap_or_default();
        info!("Running {} task(s)", tasks.len());

        let mut results = Vec::with_capacity(tasks.len());
        for (index, task) in tasks.iter().enumerate() {
            debug!("Task {} of {}", index + 1, tasks.len());
            results.extend(self.run_task(task).await);
        }
        Ok(results)
    }

    async fn run_task(&self, task: &Value) -> Vec<ResPlayBook> {
        let Some(mapping) = task.as_mapping() else {
            warn!("Task is not a mapping: {:?}", task);
            let err = ModuleError::Parse {
                reason: "task is not a mapping".to_string(),
            };
            return vec![ResPlayBook::fail("", UNKNOWN_MODEL, err.to_string())];
        };
        let name = mapping
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default();

        let module_name = match TaskRoute::of(mapping) {
            Some(TaskRoute::Module(module)) => module,
            Some(TaskRoute::Skip(module)) => {
                debug!("Skipping task '{}': {} tasks are not run", name, module);
                return Vec::new();
            }
            None => {
                warn!("Task '{}' names no known module", name);
                let err = ModuleError::from(ValidationError::NoModule);
                return vec![ResPlayBook::fail(name, UNKNOWN_MODEL, err.to_string())];
            }
        };

        let Some(module) = self.registry.dispatch(module_name) else {
            let err = RunnerError::ModuleNotFound {
                module: module_name.to_string(),
            };
            return vec![ResPlayBook::fail(name, module_name, err.to_string())];
        };

        let text = match serde_yaml::to_string(task) {
            Ok(text) => text,
            Err(e) => {
                let err = ModuleError::from(e);
                return vec![ResPlayBook::fail(name, module_name, err.to_string())];
            }
        };

        module.run_one(&text).await;
        let results = module.drain_results().await;
        for result in &results {
            match result.status {
                PlayStatus::Success => info!("{}", result),
                _ => warn!("{}", result),
            }
        }
        results
    }

    /// Run a whole document as a list of one module's tasks
    pub async fn run_module(
        &self,
        module_name: &str,
        task_list: &str,
    ) -> Result<Vec<ResPlayBook>, RunnerError> {
        let module = self
            .registry
            .dispatch(module_name)
            .ok_or_else(|| RunnerError::ModuleNotFound {
                module: module_name.to_string(),
            })?;

        module.run_all(task_list).await;
        Ok(module.drain_results().await)
    }
}
