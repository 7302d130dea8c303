//! chunkwire server binary.
//!
//! Configuration is loaded from `config.ron` and can be overridden via CLI flags.
//! Loads the protocol tables from the data directory, then prepares a flat
//! demo chunk once per configured protocol on the worker pool.
//!
//! Run with `cargo run -p chunkwire-server -- --data-dir ./data --protocol 486`.

use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use chunkwire_config::{CliArgs, Config, ConfigError};
use chunkwire_mapping::{MappingError, MappingStore};
use chunkwire_nbt::{CompoundTag, Tag};
use chunkwire_pipeline::{
    CachedChunk, ChunkPrepPool, ChunkPrepRequest, PrepError, PrepHandle, compressor_from_config,
};
use chunkwire_world::{Chunk, Dimension, Tile, WorldError, full_block_id};
use clap::Parser;
use tracing::{error, info, warn};

const BEDROCK: u32 = 7;
const STONE: u32 = 1;
const DIRT: u32 = 3;
const GRASS: u32 = 2;
const PLAINS: u8 = 1;

/// How long to wait for the demo preparations.
const PREP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Mapping(#[from] MappingError),
    #[error(transparent)]
    Prep(#[from] PrepError),
    #[error(transparent)]
    World(#[from] WorldError),
    #[error("preparation queue full for protocol {0}")]
    QueueFull(u32),
    #[error("{0} preparations still pending after {1:?}")]
    Timeout(usize, Duration),
}

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let Some(config_dir) = args
        .config
        .clone()
        .or_else(|| dirs::config_dir().map(|dir| dir.join("chunkwire")))
    else {
        eprintln!("Failed to resolve config directory, pass --config");
        return ExitCode::FAILURE;
    };

    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config
        .debug
        .log_dir
        .clone()
        .unwrap_or_else(|| config_dir.join("logs"));
    chunkwire_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "chunkwire failed");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &Config) -> Result<(), ServerError> {
    config.validate()?;
    let store = MappingStore::open(&config.data.data_dir)?;
    if config.data.eager_tables {
        store.preload(&config.data.protocols)?;
        info!(buckets = ?store.loaded_buckets(), "Protocol tables preloaded");
    }

    let compressor = compressor_from_config(&config.compression);
    let pool = ChunkPrepPool::from_config(&config.pipeline, compressor)?;

    let chunk = demo_chunk()?;
    let failures = Arc::new(AtomicUsize::new(0));
    let mut handles: Vec<(u32, PrepHandle)> = Vec::new();

    for &protocol in &config.data.protocols {
        let tables = store.tables(protocol)?;
        let request = ChunkPrepRequest::new(
            0,
            0,
            Dimension::Overworld.id(),
            &chunk,
            tables,
            Arc::clone(store.biome_ids()),
        )?;

        let failed = Arc::clone(&failures);
        let handle = pool
            .submit_with_error(request, move |err| {
                warn!(protocol, error = %err, "Demo chunk preparation failed");
                failed.fetch_add(1, Ordering::Relaxed);
            })
            .map_err(|_| ServerError::QueueFull(protocol))?;
        handle
            .promise()
            .on_resolve(move |cached| log_prepared(protocol, cached));
        handles.push((protocol, handle));
    }

    let deadline = Instant::now() + PREP_TIMEOUT;
    while handles.iter().any(|(_, h)| !h.state().is_finished()) {
        if Instant::now() >= deadline {
            let pending = handles.iter().filter(|(_, h)| !h.state().is_finished()).count();
            return Err(ServerError::Timeout(pending, PREP_TIMEOUT));
        }
        if pool.poll() == 0 {
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    info!(
        prepared = handles.len() - failures.load(Ordering::Relaxed),
        failed = failures.load(Ordering::Relaxed),
        "Demo chunk preparation finished"
    );
    Ok(())
}

fn log_prepared(protocol: u32, cached: &Arc<CachedChunk>) {
    info!(
        protocol,
        sub_chunks = cached.sub_chunk_count(),
        distinct_sub_chunks = cached.blob_count(),
        compressed_bytes = cached.compressed_size(),
        chunk_data_bytes = cached.compressed_chunk_data().len(),
        "Demo chunk prepared"
    );
}

/// A flat overworld column: bedrock floor, stone, dirt and a grass top, one
/// sign on the surface, plains everywhere.
fn demo_chunk() -> Result<Chunk, WorldError> {
    let mut chunk = Chunk::for_dimension(Dimension::Overworld);
    let floor = chunk.range().min() * 16;
    let layers = [(BEDROCK, 1), (STONE, 60), (DIRT, 3), (GRASS, 1)];

    let mut y = floor;
    for (block, depth) in layers {
        for _ in 0..depth {
            for x in 0..16 {
                for z in 0..16 {
                    chunk.set_full_block(x, y, z, full_block_id(block, 0))?;
                }
            }
            y += 1;
        }
    }
    chunk.set_biome_ids([PLAINS; 256]);

    let text = CompoundTag::new().with("Text", Tag::string("chunkwire"));
    chunk.add_tile(Tile::spawnable(8, y, 8, "Sign", text));
    chunk.collect_garbage();
    Ok(chunk)
}
