//! Command-line argument parsing for the Tellus engine.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Tellus engine command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "tellus", about = "Tellus globe engine")]
pub struct CliArgs {
    /// Clipmap window size in posts (odd).
    #[arg(long)]
    pub clipmap_posts: Option<i64>,

    /// Tile cache directory.
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Tile loader worker threads.
    #[arg(long)]
    pub loader_threads: Option<usize>,

    /// Render terrain as wireframe.
    #[arg(long)]
    pub wireframe: Option<bool>,

    /// Freeze LOD updates.
    #[arg(long)]
    pub freeze_lod: Option<bool>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(posts) = args.clipmap_posts {
            self.terrain.clipmap_posts = posts;
        }
        if let Some(ref dir) = args.cache_dir {
            self.cache.directory = dir.clone();
        }
        if let Some(threads) = args.loader_threads {
            self.cache.loader_threads = threads;
        }
        if let Some(wireframe) = args.wireframe {
            self.render.wireframe = wireframe;
        }
        if let Some(freeze) = args.freeze_lod {
            self.debug.freeze_lod = freeze;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
