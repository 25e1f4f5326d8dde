//! Rustle Play - single-host playbook runner
//!
//! Applies an ordered YAML list of tasks to the local machine. Each task names
//! one module (`file`, `shell`, ...) and is routed through the
//! [`ModuleRegistry`]; shell tasks run through a privileged process executor
//! under a per-command identity and deadline.

#[cfg(not(unix))]
compile_error!("rustle-play only supports unix targets");

pub mod cli;
pub mod modules;
pub mod runtime;

pub use modules::{ModuleRegistry, PlayModule, PlayStatus, ResPlayBook};
pub use runtime::{RunnerConfig, RunnerError, TaskRunner};
