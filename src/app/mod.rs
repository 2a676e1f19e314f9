//! Application Layer
//!
//! User-facing CLI, configuration management and the on-disk layout.

pub mod cli;
pub mod config;
pub mod paths;

pub use cli::Cli;
pub use config::Config;
pub use paths::{Paths, TaskLayout};
