//! Playbook modules and the registry that dispatches tasks to them

pub mod args;
pub mod core;
pub mod error;
pub mod files;
pub mod interface;
pub mod registry;

// Re-export commonly used types
pub use error::*;
pub use interface::*;
pub use registry::ModuleRegistry;
