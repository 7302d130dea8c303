//! `config.ron` layout, defaults and persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Name of the persisted configuration file inside the config directory.
const CONFIG_FILE: &str = "config.ron";

/// Top-level service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Where the per-protocol data tables live and which ones to build.
    pub data: DataConfig,
    /// Chunk preparation worker pool settings.
    pub pipeline: PipelineConfig,
    /// Compression applied to prepared chunk buffers.
    pub compression: CompressionSettings,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Data table configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DataConfig {
    /// Directory holding `canonical_block_states*.nbt`, `r12_to_current_block_map*.bin`,
    /// `required_item_list*.json`, `block_id_map.json` and `biome_id_map.json`.
    pub data_dir: PathBuf,
    /// Protocol versions whose tables are built at startup.
    pub protocols: Vec<u32>,
    /// Build every configured protocol's tables before serving anything.
    /// When false, tables are built on first use.
    pub eager_tables: bool,
}

/// Worker pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of worker threads. 0 derives the count from the CPU count.
    pub worker_threads: usize,
    /// Maximum number of queued preparation requests.
    pub max_in_flight: usize,
    /// Capacity of the completion channel read by the owning thread.
    pub result_capacity: usize,
}

/// Compression algorithm for prepared buffers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CompressionAlgorithm {
    /// Raw deflate, as expected by game clients.
    Deflate,
    /// Size-prepended LZ4.
    Lz4,
}

/// Compression configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CompressionSettings {
    /// Which algorithm to use.
    pub algorithm: CompressionAlgorithm,
    /// Deflate level (0-9). Ignored by LZ4.
    pub level: u32,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Directory for JSON log files in debug builds.
    pub log_dir: Option<PathBuf>,
}

// --- Default implementations ---

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            protocols: vec![486],
            eager_tables: true,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            max_in_flight: 256,
            result_capacity: 512,
        }
    }
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            algorithm: CompressionAlgorithm::Deflate,
            level: 7,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

// --- Load / Save / Reload ---

/// Path of the configuration file inside `config_dir`.
pub fn config_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE)
}

fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: Config = ron::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Reads `config.ron` from `config_dir`, writing the defaults there first
    /// when it does not exist yet.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = config_path(config_dir);
        if !path.exists() {
            let config = Self::default();
            config.save(config_dir)?;
            log::info!("Wrote default chunkwire config to {}", path.display());
            return Ok(config);
        }
        let config = read_config(&path)?;
        log::info!(
            "Loaded chunkwire config from {} (protocols {:?})",
            path.display(),
            config.data.protocols
        );
        Ok(config)
    }

    /// Writes `config.ron` into `config_dir`, creating the directory.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        let path = config_path(config_dir);
        let write_err = |source| ConfigError::Write {
            path: path.clone(),
            source,
        };
        std::fs::create_dir_all(config_dir).map_err(write_err)?;

        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);
        let text = ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::Serialize)?;
        std::fs::write(&path, text).map_err(write_err)
    }

    /// Re-reads `config.ron`. `Some` only when the file differs from `self`.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let fresh = read_config(&config_path(config_dir))?;
        if fresh == *self {
            return Ok(None);
        }
        log::info!("chunkwire config changed on disk");
        Ok(Some(fresh))
    }

    /// Rejects values the services cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data.protocols.is_empty() {
            return Err(ConfigError::Invalid {
                field: "data.protocols",
                reason: "at least one protocol is required".to_string(),
            });
        }
        if self.pipeline.max_in_flight == 0 {
            return Err(ConfigError::Invalid {
                field: "pipeline.max_in_flight",
                reason: "must be positive".to_string(),
            });
        }
        if self.pipeline.result_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "pipeline.result_capacity",
                reason: "must be positive".to_string(),
            });
        }
        if self.compression.level > 9 {
            return Err(ConfigError::Invalid {
                field: "compression.level",
                reason: format!("{} is above the deflate maximum of 9", self.compression.level),
            });
        }
        Ok(())
    }
}
