use thiserror::Error;

use crate::modules::files::utils::FileError;

/// Errors that can occur while a module interprets and applies a task
#[derive(Error, Debug)]
pub enum ModuleError {
    #[error("Parse error: {reason}")]
    Parse { reason: String },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Credential lookup failed for {user}:{group}: {reason}")]
    CredentialLookupFailed {
        user: String,
        group: String,
        reason: String,
    },

    #[error("no command from empty string")]
    EmptyCommand,

    #[error("not command")]
    NoCommand,

    #[error("Failed to start {program}: {error}")]
    StartFailed { program: String, error: String },

    #[error("Failed to wait for {program}: {error}")]
    WaitFailed { program: String, error: String },

    #[error("Command timed out after {timeout}s, STDOUT:{stdout},STDERR:{stderr}")]
    Timeout {
        timeout: u64,
        stdout: String,
        stderr: String,
    },

    #[error("Command failed with exit code {}, STDOUT:{stdout},STDERR:{stderr}", fmt_code(*.code))]
    CommandFailed {
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("Command instance has already been run")]
    CommandReused,

    #[error("Filesystem error during {operation} on {path}: {error}")]
    Filesystem {
        operation: String,
        path: String,
        error: String,
    },

    #[error("File error: {0}")]
    File(#[from] FileError),
}

fn fmt_code(code: Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "none (terminated by signal)".to_string(),
    }
}

/// Errors raised while checking a task's typed arguments
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no file name")]
    NoFileName,

    #[error("no shell content")]
    NoShellContent,

    #[error("file mode content error: {mode}")]
    FileModeContentError { mode: String },

    #[error("Missing required argument: {arg}")]
    MissingRequiredArg { arg: String },

    #[error("no state({state})")]
    UnknownState { state: String },

    #[error("no module found in task")]
    NoModule,

    #[error("timeout out of range: {timeout}s")]
    TimeoutOutOfRange { timeout: u64 },
}

impl ModuleError {
    /// Wrap an I/O failure with the operation and path that produced it
    pub fn filesystem(
        operation: &str,
        path: impl AsRef<std::path::Path>,
        err: std::io::Error,
    ) -> Self {
        ModuleError::Filesystem {
            operation: operation.to_string(),
            path: path.as_ref().display().to_string(),
            error: err.to_string(),
        }
    }

    /// True when the executor gave up on the process because of its deadline
    pub fn is_timeout(&self) -> bool {
        matches!(self, ModuleError::Timeout { .. })
    }
}

impl From<serde_yaml::Error> for ModuleError {
    fn from(err: serde_yaml::Error) -> Self {
        ModuleError::Parse {
            reason: err.to_string(),
        }
    }
}
