use color_eyre::{eyre::eyre, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Route `tracing` output to a daily log file; the terminal belongs to the UI.
///
/// `RUST_LOG` wins over `log.level`. Keep the returned guard alive until exit
/// so buffered lines are flushed.
pub fn init(config: &Config) -> Result<WorkerGuard> {
  let directory = config.log_directory();
  std::fs::create_dir_all(&directory)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", directory.display(), e))?;

  let file_appender = tracing_appender::rolling::daily(&directory, "schooladm.log");
  let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

  let filter = EnvFilter::try_from_default_env()
    .or_else(|_| EnvFilter::try_new(&config.log.level))
    .map_err(|e| eyre!("Invalid log level '{}': {}", config.log.level, e))?;

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(non_blocking_writer)
    .with_ansi(false)
    .with_target(true)
    .try_init()
    .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

  Ok(guard)
}
