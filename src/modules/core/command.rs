//! Process executor
//!
//! A [`Command`] runs exactly one child process under a resolved user/group
//! identity, in its own process group, with a hard deadline. stdout and stderr
//! are captured into separate buffers that stay readable after the run,
//! including the partial output of a process killed at its deadline.

use chrono::{DateTime, Utc};
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::modules::core::tokenizer::tokenize;
use crate::modules::error::{ModuleError, ValidationError};
use crate::modules::files::utils::lookup_credential;

pub const DEFAULT_TIMEOUT: u64 = 60;
pub const DEFAULT_USER: &str = "root";
pub const DEFAULT_GROUP: &str = "root";

/// Appended to the environment of interpreter-wrapped commands
const SHELL_LANG: (&str, &str) = ("LANG", "en_US.UTF-8");

/// How long to keep draining pipes once the process group has been killed
const PIPE_GRACE: Duration = Duration::from_secs(1);

/// One process invocation
#[derive(Debug)]
pub struct Command {
    content: String,
    env: Vec<(String, String)>,
    dir: Option<PathBuf>,
    user: String,
    group: String,
    ids: Option<(u32, u32)>,
    timeout: u64,
    interpreter: Option<String>,
    state: Mutex<ExecState>,
}

#[derive(Debug, Default)]
struct ExecState {
    started: bool,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    start_time: Option<DateTime<Utc>>,
    stop_time: Option<DateTime<Utc>>,
}

impl Command {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            env: Vec::new(),
            dir: None,
            user: DEFAULT_USER.to_string(),
            group: DEFAULT_GROUP.to_string(),
            ids: None,
            timeout: DEFAULT_TIMEOUT,
            interpreter: None,
            state: Mutex::new(ExecState::default()),
        }
    }

    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// Run under raw numeric ids instead of looking up user/group names
    pub fn with_ids(mut self, uid: u32, gid: u32) -> Self {
        self.ids = Some((uid, gid));
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Hand the whole content to `interpreter -c` instead of tokenizing it.
    /// The child also gets `LANG=en_US.UTF-8`.
    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = Some(interpreter.into());
        self.env
            .push((SHELL_LANG.0.to_string(), SHELL_LANG.1.to_string()));
        self
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn timeout(&self) -> u64 {
        self.timeout
    }

    /// Argument vector the child is spawned with
    pub fn argv(&self) -> Result<Vec<String>, ModuleError> {
        match &self.interpreter {
            Some(interpreter) => {
                if self.content.trim().is_empty() {
                    return Err(ModuleError::NoCommand);
                }
                Ok(vec![
                    interpreter.clone(),
                    "-c".to_string(),
                    self.content.clone(),
                ])
            }
            None => tokenize(&self.content).map_err(|_| ModuleError::NoCommand),
        }
    }

    fn resolve_identity(&self) -> Result<(u32, u32), ModuleError> {
        if let Some(ids) = self.ids {
            return Ok(ids);
        }
        let (uid, gid) = lookup_credential(&self.user, Some(&self.group)).map_err(|e| {
            ModuleError::CredentialLookupFailed {
                user: self.user.clone(),
                group: self.group.clone(),
                reason: e.to_string(),
            }
        })?;
        Ok((uid.as_raw(), gid.as_raw()))
    }

    /// Spawn the process and wait for it to exit or hit its deadline.
    ///
    /// The deadline counts from the moment `run` is called. A command can only
    /// be run once; concurrent callers are serialised on the instance lock.
    pub async fn run(&self) -> Result<(), ModuleError> {
        let mut state = self.state.lock().await;
        if state.started {
            return Err(ModuleError::CommandReused);
        }
        state.started = true;

        let deadline = Instant::now()
            .checked_add(Duration::from_secs(self.timeout))
            .ok_or(ValidationError::TimeoutOutOfRange {
                timeout: self.timeout,
            })?;
        let argv = self.argv()?;
        let (uid, gid) = self.resolve_identity()?;

        debug!(
            "Running `{}` as {}:{} (timeout {}s)",
            shell_words::join(&argv),
            uid,
            gid,
            self.timeout
        );

        let mut cmd = tokio::process::Command::new(&argv[0]);
        cmd.args(&argv[1..])
            .uid(uid)
            .gid(gid)
            .process_group(0)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if !self.env.is_empty() {
            cmd.envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        if let Some(dir) = &self.dir {
            cmd.current_dir(dir);
        }

        state.start_time = Some(Utc::now());
        let mut child = cmd.spawn().map_err(|e| ModuleError::StartFailed {
            program: argv[0].clone(),
            error: e.to_string(),
        })?;
        let pgid = child.id().map(|id| Pid::from_raw(id as i32));

        let mut stdout_pipe = OutputPipe::spawn(child.stdout.take());
        let mut stderr_pipe = OutputPipe::spawn(child.stderr.take());

        let waited = tokio::time::timeout_at(deadline, child.wait()).await;
        let status = match waited {
            Ok(Ok(status)) => Some(status),
            Ok(Err(e)) => {
                kill_process_group(pgid);
                stdout_pipe.abort();
                stderr_pipe.abort();
                state.stop_time = Some(Utc::now());
                return Err(ModuleError::WaitFailed {
                    program: argv[0].clone(),
                    error: e.to_string(),
                });
            }
            Err(_) => {
                warn!(
                    "`{}` exceeded its {}s deadline, killing process group",
                    self.content, self.timeout
                );
                kill_process_group(pgid);
                if let Err(e) = child.kill().await {
                    debug!("kill after timeout: {}", e);
                }
                None
            }
        };

        // Descendants that outlive the child keep the pipes open; they get
        // until the deadline before the whole group is killed.
        let drain_until = match status {
            Some(_) => deadline,
            None => Instant::now() + PIPE_GRACE,
        };
        let drained = tokio::time::timeout_at(drain_until, async {
            stdout_pipe.join().await;
            stderr_pipe.join().await;
        })
        .await;
        if drained.is_err() {
            kill_process_group(pgid);
            let _ = tokio::time::timeout(PIPE_GRACE, async {
                stdout_pipe.join().await;
                stderr_pipe.join().await;
            })
            .await;
            stdout_pipe.abort();
            stderr_pipe.abort();
        }

        state.stdout = stdout_pipe.take().await;
        state.stderr = stderr_pipe.take().await;
        state.stop_time = Some(Utc::now());

        let stdout = String::from_utf8_lossy(&state.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&state.stderr).into_owned();

        match status {
            None => Err(ModuleError::Timeout {
                timeout: self.timeout,
                stdout,
                stderr,
            }),
            Some(status) if status.success() => {
                debug!("`{}` exited successfully", self.content);
                Ok(())
            }
            Some(status) => Err(ModuleError::CommandFailed {
                code: status.code(),
                stdout,
                stderr,
            }),
        }
    }

    pub async fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.state.lock().await.stdout).into_owned()
    }

    pub async fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.state.lock().await.stderr).into_owned()
    }

    pub async fn start_time(&self) -> Option<DateTime<Utc>> {
        self.state.lock().await.start_time
    }

    pub async fn stop_time(&self) -> Option<DateTime<Utc>> {
        self.state.lock().await.stop_time
    }
}

fn kill_process_group(pgid: Option<Pid>) {
    if let Some(pgid) = pgid {
        if let Err(e) = killpg(pgid, Signal::SIGKILL) {
            debug!("killpg {}: {}", pgid, e);
        }
    }
}

/// Background reader that drains one child pipe into a shared buffer
struct OutputPipe {
    buffer: Arc<Mutex<Vec<u8>>>,
    task: Option<JoinHandle<()>>,
}

impl OutputPipe {
    fn spawn<R>(pipe: Option<R>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let task = pipe.map(|mut pipe| {
            let buffer = Arc::clone(&buffer);
            tokio::spawn(async move {
                let mut chunk = [0u8; 8192];
                loop {
                    match pipe.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => buffer.lock().await.extend_from_slice(&chunk[..n]),
                    }
                }
            })
        });
        Self { buffer, task }
    }

    async fn join(&mut self) {
        if let Some(task) = self.task.as_mut() {
            let _ = task.await;
            self.task = None;
        }
    }

    fn abort(&self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }

    async fn take(&self) -> Vec<u8> {
        std::mem::take(&mut *self.buffer.lock().await)
    }
}

/// Run `command` through `/bin/sh -c` under raw ids with a deadline and return
/// stdout followed by stderr. On failure the error carries the partial output.
pub async fn exec_shell_by_timeout(
    timeout: u64,
    command: &str,
    uid: u32,
    gid: u32,
) -> Result<String, ModuleError> {
    let cmd = Command::new(command)
        .with_interpreter("/bin/sh")
        .with_ids(uid, gid)
        .with_timeout(timeout);
    cmd.run().await?;

    let mut output = cmd.stdout().await;
    output.push_str(&cmd.stderr().await);
    Ok(output)
}
