//! Utility functions for file operations

pub mod ownership;
pub mod permissions;

pub use ownership::*;
pub use permissions::*;

use std::path::Path;
use thiserror::Error;

/// Common file operation errors
#[derive(Error, Debug)]
pub enum FileError {
    #[error("Unknown user: {user}")]
    UnknownUser { user: String },

    #[error("Unknown group: {group}")]
    UnknownGroup { group: String },

    #[error("File not found: {path}")]
    NotFound { path: String },

    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

/// Report whether `path` exists. A missing path is `Ok(false)`; any other
/// failure to stat the path is returned as an error.
pub async fn path_exists(path: impl AsRef<Path>) -> Result<bool, FileError> {
    match tokio::fs::symlink_metadata(path.as_ref()).await {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
