//! Command-line argument parsing for the chunkwire server.

use std::path::PathBuf;

use clap::Parser;

use crate::{CompressionAlgorithm, Config};

/// chunkwire command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "chunkwire", about = "Bedrock chunk wire preparation service")]
pub struct CliArgs {
    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory holding the block/item/biome data tables.
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Protocol version to serve. Repeat for several; replaces the configured list.
    #[arg(long = "protocol")]
    pub protocols: Vec<u32>,

    /// Worker thread count (0 = all CPUs but two).
    #[arg(long)]
    pub workers: Option<usize>,

    /// Compression algorithm for prepared buffers (deflate, lz4).
    #[arg(long, value_parser = parse_algorithm)]
    pub compression: Option<CompressionAlgorithm>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,
}

fn parse_algorithm(s: &str) -> Result<CompressionAlgorithm, String> {
    match s.to_ascii_lowercase().as_str() {
        "deflate" | "zlib" => Ok(CompressionAlgorithm::Deflate),
        "lz4" => Ok(CompressionAlgorithm::Lz4),
        other => Err(format!("unknown compression algorithm '{other}'")),
    }
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(ref dir) = args.data_dir {
            self.data.data_dir = dir.clone();
        }
        if !args.protocols.is_empty() {
            self.data.protocols = args.protocols.clone();
        }
        if let Some(workers) = args.workers {
            self.pipeline.worker_threads = workers;
        }
        if let Some(algorithm) = args.compression {
            self.compression.algorithm = algorithm;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
