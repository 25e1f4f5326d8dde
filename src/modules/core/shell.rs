//! Shell module - runs a command line through the process executor

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::modules::args::{present, scalar_string};
use crate::modules::core::command::{Command, DEFAULT_GROUP, DEFAULT_TIMEOUT, DEFAULT_USER};
use crate::modules::error::{ModuleError, ValidationError};
use crate::modules::files::utils::path_exists;
use crate::modules::interface::{PlayModule, ResPlayBook};

const MODEL: &str = "shell";

/// Reported when `creates`/`removes` say the command has nothing to do
pub const SKIP_MESSAGE: &str = "this step will not be run";

/// Identity and deadline used when a task does not set its own
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellDefaults {
    pub timeout: u64,
    pub user: String,
    pub group: String,
}

impl Default for ShellDefaults {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user: DEFAULT_USER.to_string(),
            group: DEFAULT_GROUP.to_string(),
        }
    }
}

/// One task of the shell module
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellBook {
    pub name: String,
    #[serde(deserialize_with = "scalar_string")]
    pub shell: Option<String>,
    #[serde(deserialize_with = "scalar_string")]
    pub command: Option<String>,
    pub args: ShellArgs,
    pub ignore_errors: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellArgs {
    #[serde(deserialize_with = "scalar_string")]
    pub chdir: Option<String>,
    /// A filename; when it already exists, this step will not be run
    #[serde(deserialize_with = "scalar_string")]
    pub creates: Option<String>,
    /// A filename; when it does not exist, this step will not be run
    #[serde(deserialize_with = "scalar_string")]
    pub removes: Option<String>,
    #[serde(deserialize_with = "scalar_string")]
    pub executable: Option<String>,
    #[serde(deserialize_with = "scalar_string")]
    pub user: Option<String>,
    #[serde(deserialize_with = "scalar_string")]
    pub group: Option<String>,
    pub timeout: Option<u64>,
}

impl ShellBook {
    /// Command text: `shell`, falling back to `command`
    pub fn content(&self) -> Result<&str, ValidationError> {
        present(&self.shell)
            .or_else(|| present(&self.command))
            .ok_or(ValidationError::NoShellContent)
    }
}

impl ShellArgs {
    /// Relative marker paths are resolved against `chdir`
    fn marker_path(&self, marker: &str) -> PathBuf {
        match present(&self.chdir) {
            Some(dir) => Path::new(dir).join(marker),
            None => PathBuf::from(marker),
        }
    }

    /// True when `creates` already exists or `removes` is missing
    pub async fn should_skip(&self) -> bool {
        if let Some(creates) = present(&self.creates) {
            if path_exists(self.marker_path(creates)).await.unwrap_or(false) {
                return true;
            }
        }
        if let Some(removes) = present(&self.removes) {
            if !path_exists(self.marker_path(removes)).await.unwrap_or(false) {
                return true;
            }
        }
        false
    }
}

/// Shell module implementation
#[derive(Default)]
pub struct ShellModule {
    defaults: ShellDefaults,
    results: Mutex<Vec<ResPlayBook>>,
}

impl ShellModule {
    pub fn new(defaults: ShellDefaults) -> Self {
        Self {
            defaults,
            results: Mutex::new(Vec::new()),
        }
    }

    /// Build the executor command for a task
    pub fn build_command(&self, book: &ShellBook) -> Result<Command, ModuleError> {
        let args = &book.args;
        let mut cmd = Command::new(book.content()?)
            .with_user(present(&args.user).unwrap_or(self.defaults.user.as_str()))
            .with_group(present(&args.group).unwrap_or(self.defaults.group.as_str()))
            .with_timeout(
                args.timeout
                    .filter(|t| *t != 0)
                    .unwrap_or(self.defaults.timeout),
            );

        if let Some(dir) = present(&args.chdir) {
            cmd = cmd.with_dir(dir);
        }
        if let Some(executable) = present(&args.executable) {
            cmd = cmd.with_interpreter(executable);
        }
        Ok(cmd)
    }

    /// Run one task and return its success message
    pub async fn execute(&self, book: &ShellBook) -> Result<String, ModuleError> {
        book.content()?;
        if book.args.should_skip().await {
            info!("Skipping shell task '{}'", book.name);
            return Ok(SKIP_MESSAGE.to_string());
        }

        let cmd = self.build_command(book)?;
        cmd.run().await?;
        Ok(format!(
            "STDOUT:{},STDERR:{}",
            cmd.stdout().await,
            cmd.stderr().await
        ))
    }

    async fn execute_book(&self, book: &ShellBook) -> ResPlayBook {
        info!("Running shell task '{}'", book.name);

        match self.execute(book).await {
            Ok(msg) => ResPlayBook::success(&book.name, MODEL, msg),
            Err(e) if book.ignore_errors => {
                warn!("Shell task '{}' failed, ignoring: {}", book.name, e);
                ResPlayBook::success(&book.name, MODEL, format!("ignored error: {e}"))
            }
            Err(e) => {
                warn!("Shell task '{}' failed: {}", book.name, e);
                ResPlayBook::fail(&book.name, MODEL, e.to_string())
            }
        }
    }
}

#[async_trait]
impl PlayModule for ShellModule {
    fn name(&self) -> &'static str {
        MODEL
    }

    async fn run_all(&self, task_list: &str) {
        let books: Vec<ShellBook> = match serde_yaml::from_str(task_list) {
            Ok(books) => books,
            Err(e) => {
                let msg = ModuleError::from(e).to_string();
                self.collect_result(ResPlayBook::fail("", MODEL, msg)).await;
                return;
            }
        };

        if books.is_empty() {
            self.collect_result(ResPlayBook::fail("", MODEL, "shell book no data"))
                .await;
            return;
        }

        for book in &books {
            let result = self.execute_book(book).await;
            self.collect_result(result).await;
        }
    }

    async fn run_one(&self, task: &str) {
        let result = match serde_yaml::from_str::<ShellBook>(task) {
            Ok(book) => self.execute_book(&book).await,
            Err(e) => ResPlayBook::fail("", MODEL, ModuleError::from(e).to_string()),
        };
        self.collect_result(result).await;
    }

    async fn collect_result(&self, result: ResPlayBook) {
        self.results.lock().await.push(result);
    }

    async fn drain_results(&self) -> Vec<ResPlayBook> {
        std::mem::take(&mut *self.results.lock().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> ShellBook {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_parse_full_task() {
        let book = parse(
            r#"
name: build
shell: make all
args:
  chdir: /tmp/project
  creates: out.bin
  user: 1000
  timeout: 5
ignore_errors: true
"#,
        );
        assert_eq!(book.name, "build");
        assert_eq!(book.content().unwrap(), "make all");
        assert_eq!(book.args.user.as_deref(), Some("1000"));
        assert_eq!(book.args.timeout, Some(5));
        assert!(book.ignore_errors);
    }

    #[test]
    fn test_content_falls_back_to_command() {
        let book = parse("name: x\ncommand: ls -la");
        assert_eq!(book.content().unwrap(), "ls -la");

        let book = parse("name: x\nshell: ''\ncommand: ''");
        assert_eq!(book.content().unwrap_err(), ValidationError::NoShellContent);
    }

    #[test]
    fn test_marker_path_uses_chdir() {
        let args = ShellArgs {
            chdir: Some("/srv/app".to_string()),
            ..Default::default()
        };
        assert_eq!(args.marker_path("done"), PathBuf::from("/srv/app/done"));
        assert_eq!(args.marker_path("/tmp/done"), PathBuf::from("/tmp/done"));
    }

    #[test]
    fn test_build_command_applies_overrides() {
        let module = ShellModule::new(ShellDefaults::default());
        let book = parse("shell: echo hi\nargs:\n  timeout: 7\n  executable: /bin/sh");
        let cmd = module.build_command(&book).unwrap();
        assert_eq!(cmd.timeout(), 7);
        assert_eq!(cmd.argv().unwrap(), vec!["/bin/sh", "-c", "echo hi"]);

        let book = parse("shell: echo hi\nargs:\n  timeout: 0");
        assert_eq!(module.build_command(&book).unwrap().timeout(), DEFAULT_TIMEOUT);
    }
}
