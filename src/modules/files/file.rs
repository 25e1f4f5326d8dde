//! File module for managing file state and permissions

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::modules::args::{present, scalar_string};
use crate::modules::error::{ModuleError, ValidationError};
use crate::modules::interface::{PlayModule, ResPlayBook};

use super::platform;
use super::utils::{chown_path, get_mode, path_exists, set_mode, FileError, ModeSpec};

const MODEL: &str = "file";

/// Declared target state of the managed path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileState {
    Absent,    // Remove path recursively
    Touch,     // Create empty file or bump mtime
    Link,      // Symbolic link to src
    Hard,      // Hard link to src
    Directory, // Directory with all ancestors
}

impl std::str::FromStr for FileState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "absent" => Ok(FileState::Absent),
            "touch" => Ok(FileState::Touch),
            "link" => Ok(FileState::Link),
            "hard" => Ok(FileState::Hard),
            "directory" => Ok(FileState::Directory),
            _ => Err(ValidationError::UnknownState {
                state: s.to_string(),
            }),
        }
    }
}

/// One task of the file module
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileBook {
    pub name: String,
    pub file: Option<FileArgs>,
}

/// File module arguments
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileArgs {
    #[serde(deserialize_with = "scalar_string")]
    pub src: Option<String>,
    #[serde(deserialize_with = "scalar_string")]
    pub dest: Option<String>,
    #[serde(deserialize_with = "scalar_string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "scalar_string")]
    pub owner: Option<String>,
    #[serde(deserialize_with = "scalar_string")]
    pub group: Option<String>,
    #[serde(deserialize_with = "scalar_string")]
    pub state: Option<String>,
    #[serde(deserialize_with = "scalar_string")]
    pub mode: Option<String>,
    #[serde(deserialize_with = "scalar_string")]
    pub path: Option<String>,
}

impl FileArgs {
    /// Path to the managed file: `name`, then `path`, then `dest`
    pub fn target(&self) -> Result<&str, ValidationError> {
        present(&self.name)
            .or_else(|| present(&self.path))
            .or_else(|| present(&self.dest))
            .ok_or(ValidationError::NoFileName)
    }

    pub fn file_state(&self) -> Result<Option<FileState>, ValidationError> {
        present(&self.state)
            .map(str::parse::<FileState>)
            .transpose()
    }

    fn src(&self) -> Result<&str, ValidationError> {
        present(&self.src).ok_or_else(|| ValidationError::MissingRequiredArg {
            arg: "src".to_string(),
        })
    }
}

/// File module implementation
#[derive(Default)]
pub struct FileModule {
    results: Mutex<Vec<ResPlayBook>>,
}

impl FileModule {
    pub fn new() -> Self {
        Self::default()
    }

    async fn execute_book(&self, book: &FileBook) -> ResPlayBook {
        info!("Running file task '{}'", book.name);

        let outcome = match &book.file {
            Some(args) => self.apply(args).await,
            None => Err(ValidationError::MissingRequiredArg {
                arg: MODEL.to_string(),
            }
            .into()),
        };

        match outcome {
            Ok(msg) => ResPlayBook::success(&book.name, MODEL, msg),
            Err(e) => {
                warn!("File task '{}' failed: {}", book.name, e);
                ResPlayBook::fail(&book.name, MODEL, e.to_string())
            }
        }
    }

    /// Apply the declared state, then the mode. Returns the success message.
    pub async fn apply(&self, args: &FileArgs) -> Result<String, ModuleError> {
        let target = args.target()?;
        let state = args.file_state()?;
        let mut msg = format!("path:{target}");

        if let Some(state) = state {
            self.apply_state(args, target, state).await?;
            msg.push_str(&format!(", state:{}", state_label(state)));
        }

        if let Some(mode) = present(&args.mode) {
            let bits = apply_mode(Path::new(target), mode).await?;
            msg.push_str(&format!(", mode:{bits:o}"));
        }

        Ok(msg)
    }

    async fn apply_state(
        &self,
        args: &FileArgs,
        target: &str,
        state: FileState,
    ) -> Result<(), ModuleError> {
        let path = Path::new(target);
        debug!("Applying state {:?} to {}", state, path.display());

        match state {
            FileState::Absent => remove_path(path).await,
            FileState::Touch => touch(path).await,
            FileState::Directory => platform::create_dir_tree(path)
                .await
                .map_err(|e| fs_error("create directory", path, e)),
            FileState::Link => {
                let src = Path::new(args.src()?);
                self.chown_source(args, src)?;
                if symlink_points_to(path, src).await {
                    debug!("{} already links to {}", path.display(), src.display());
                    return Ok(());
                }
                platform::create_symlink(src, path)
                    .await
                    .map_err(|e| fs_error("symlink", path, e))
            }
            FileState::Hard => {
                let src = Path::new(args.src()?);
                self.chown_source(args, src)?;
                if same_inode(path, src).await {
                    debug!("{} is already a hard link of {}", path.display(), src.display());
                    return Ok(());
                }
                platform::create_hardlink(src, path)
                    .await
                    .map_err(|e| fs_error("hard link", path, e))
            }
        }
    }

    /// Link states hand ownership to the link source, not the link itself
    fn chown_source(&self, args: &FileArgs, src: &Path) -> Result<(), ModuleError> {
        if let Some(owner) = present(&args.owner) {
            chown_path(src, owner, present(&args.group)).map_err(|e| match e {
                FileError::Io { source } => ModuleError::filesystem("chown", src, source),
                other => ModuleError::CredentialLookupFailed {
                    user: owner.to_string(),
                    group: present(&args.group).unwrap_or_default().to_string(),
                    reason: other.to_string(),
                },
            })?;
        }
        Ok(())
    }
}

#[async_trait]
impl PlayModule for FileModule {
    fn name(&self) -> &'static str {
        MODEL
    }

    async fn run_all(&self, task_list: &str) {
        let books: Vec<FileBook> = match serde_yaml::from_str(task_list) {
            Ok(books) => books,
            Err(e) => {
                let msg = ModuleError::from(e).to_string();
                self.collect_result(ResPlayBook::fail("", MODEL, msg)).await;
                return;
            }
        };

        if books.is_empty() {
            self.collect_result(ResPlayBook::fail("", MODEL, "file book no data"))
                .await;
            return;
        }

        for book in &books {
            let result = self.execute_book(book).await;
            self.collect_result(result).await;
        }
    }

    async fn run_one(&self, task: &str) {
        let result = match serde_yaml::from_str::<FileBook>(task) {
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

fn state_label(state: FileState) -> &'static str {
    match state {
        FileState::Absent => "absent",
        FileState::Touch => "touch",
        FileState::Link => "link",
        FileState::Hard => "hard",
        FileState::Directory => "directory",
    }
}

fn fs_error(operation: &str, path: &Path, err: FileError) -> ModuleError {
    match err {
        FileError::Io { source } => ModuleError::filesystem(operation, path, source),
        other => other.into(),
    }
}

async fn remove_path(path: &Path) -> Result<(), ModuleError> {
    let metadata = match tokio::fs::symlink_metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(ModuleError::filesystem("stat", path, e)),
    };

    let removed = if metadata.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };
    removed.map_err(|e| ModuleError::filesystem("remove", path, e))
}

async fn touch(path: &Path) -> Result<(), ModuleError> {
    if !path_exists(path)
        .await
        .map_err(|e| fs_error("stat", path, e))?
    {
        tokio::fs::File::create(path)
            .await
            .map_err(|e| ModuleError::filesystem("create", path, e))?;
        return Ok(());
    }

    let now = filetime::FileTime::now();
    filetime::set_file_times(path, now, now)
        .map_err(|e| ModuleError::filesystem("set file times", path, e))
}

async fn symlink_points_to(link: &Path, src: &Path) -> bool {
    matches!(tokio::fs::read_link(link).await, Ok(target) if target == src)
}

async fn same_inode(link: &Path, src: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (
        tokio::fs::symlink_metadata(link).await,
        tokio::fs::symlink_metadata(src).await,
    ) {
        (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
        _ => false,
    }
}

/// Resolve `mode` against the current permissions of `path` and apply it.
/// Returns the permission bits that were set.
async fn apply_mode(path: &Path, mode: &str) -> Result<u32, ModuleError> {
    if !path_exists(path)
        .await
        .map_err(|e| fs_error("stat", path, e))?
    {
        return Err(FileError::NotFound {
            path: path.display().to_string(),
        }
        .into());
    }

    let spec = ModeSpec::parse(mode)?;
    let current = get_mode(path).await.map_err(|e| fs_error("stat", path, e))?;
    let bits = spec.resolve(current);
    debug!("chmod {} {:o} -> {:o}", path.display(), current, bits);
    set_mode(path, bits)
        .await
        .map_err(|e| fs_error("chmod", path, e))?;
    Ok(bits)
}
