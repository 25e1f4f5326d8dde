//! Platform-specific file operations

#[cfg(unix)]
pub mod unix;

#[cfg(unix)]
pub use unix::*;
