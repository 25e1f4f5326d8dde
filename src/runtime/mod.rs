pub mod config;
pub mod error;
pub mod runner;

pub use config::*;
pub use error::*;
pub use runner::*;
