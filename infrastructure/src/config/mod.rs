//! Configuration loading and schema

pub mod file_config;
pub mod loader;

pub use file_config::{BackendConfig, FileConfig, LoggingConfig};
pub use loader::ConfigLoader;
