//! Configuration system for the Tellus globe engine.
//!
//! Runtime-configurable settings persisted to disk as RON files, with CLI
//! overrides via clap and validation at load time.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    CacheConfig, Config, DebugConfig, RenderConfig, TerrainConfig, default_config_dir,
};
pub use error::ConfigError;
