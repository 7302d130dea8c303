//! Structured logging for the chunkwire service.
//!
//! Console output with uptime timestamps and thread names (worker threads are
//! named `chunk-prep-N`), plus an optional JSON file in debug builds.

use std::path::{Path, PathBuf};

use chunkwire_config::Config;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when neither `RUST_LOG` nor the config supplies a level.
pub const DEFAULT_FILTER: &str = "info";

/// Name of the JSON log file written in debug builds.
pub const LOG_FILE_NAME: &str = "chunkwire.log";

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level. When `debug_build` is set and a
/// log directory is given (or configured), a JSON file layer is added.
///
/// ```no_run
/// use chunkwire_config::Config;
/// use chunkwire_log::init_logging;
///
/// let config = Config::default();
/// init_logging(None, cfg!(debug_assertions), Some(&config));
/// ```
pub fn init_logging(log_dir: Option<&Path>, debug_build: bool, config: Option<&Config>) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(config)));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_names(true)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    let configured_dir = config.and_then(|c| c.debug.log_dir.clone());
    let log_dir: Option<PathBuf> = log_dir.map(Path::to_path_buf).or(configured_dir);

    if debug_build
        && let Some(log_dir) = log_dir
        && std::fs::create_dir_all(&log_dir).is_ok()
        && let Ok(log_file) = std::fs::File::create(log_file_path(&log_dir))
    {
        let file_layer = fmt::layer()
            .with_writer(log_file)
            .with_ansi(false)
            .with_target(true)
            .with_timer(fmt::time::uptime())
            .json();

        subscriber.with(file_layer).init();
        return;
    }

    subscriber.init();
}

/// The filter directive derived from config, falling back to [`DEFAULT_FILTER`].
pub fn filter_directive(config: Option<&Config>) -> String {
    match config {
        Some(config) if !config.debug.log_level.trim().is_empty() => {
            config.debug.log_level.clone()
        }
        _ => DEFAULT_FILTER.to_string(),
    }
}

/// Where the JSON log lands inside `log_dir`.
pub fn log_file_path(log_dir: &Path) -> PathBuf {
    log_dir.join(LOG_FILE_NAME)
}

/// An `EnvFilter` built from [`DEFAULT_FILTER`].
pub fn default_env_filter() -> EnvFilter {
    EnvFilter::new(DEFAULT_FILTER)
}
