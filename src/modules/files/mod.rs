//! File operation modules
//!
//! - `file`: path state (absent, touch, link, hard, directory) and permissions
//! - `template`: task schema only, rendering is not implemented

pub mod file;
pub mod template;

// Utility modules
pub mod platform;
pub mod utils;

pub use file::FileModule;
pub use template::TemplateModule;

pub use file::{FileArgs, FileBook, FileState};
pub use template::{TemplateArgs, TemplateBook};
