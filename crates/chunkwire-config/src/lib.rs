//! Configuration for the chunk wire codec services.
//!
//! Settings persist to disk as a RON file and can be overridden from the
//! command line. Every section is `#[serde(default)]` so older config files
//! keep loading as new settings are added.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    CompressionAlgorithm, CompressionSettings, Config, DataConfig, DebugConfig, PipelineConfig,
    config_path,
};
pub use error::ConfigError;
