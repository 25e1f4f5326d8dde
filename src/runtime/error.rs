use thiserror::Error;

/// Errors that stop a whole run rather than a single task
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Invalid task list: {reason}")]
    InvalidTaskList { reason: String },

    #[error("Module not found: {module}")]
    ModuleNotFound { module: String },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_yaml::Error> for RunnerError {
    fn from(err: serde_yaml::Error) -> Self {
        RunnerError::InvalidTaskList {
            reason: err.to_string(),
        }
    }
}
