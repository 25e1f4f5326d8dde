//! Core execution modules

pub mod command;
pub mod shell;
pub mod tokenizer;

pub use command::{exec_shell_by_timeout, Command};
pub use shell::{ShellArgs, ShellBook, ShellDefaults, ShellModule};
pub use tokenizer::tokenize;
