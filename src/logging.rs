use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::config::Config;

const LOG_FILE_PREFIX: &str = "motivue-sync.log";
const DEFAULT_FILTER: &str = "info";

/// Keeps the background log writer alive. Logs are flushed when dropped.
pub struct LoggingGuard {
  _file_guard: WorkerGuard,
  log_dir: PathBuf,
}

impl LoggingGuard {
  pub fn log_dir(&self) -> &Path {
    &self.log_dir
  }
}

/// Install the global subscriber: a daily rolling file under the configured
/// log directory, plus stderr when `verbose` is set.
pub fn init(config: &Config, verbose: bool) -> Result<LoggingGuard> {
  let log_dir = config.log_dir()?;
  std::fs::create_dir_all(&log_dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", log_dir.display(), e))?;

  let directives = filter_directives(std::env::var("RUST_LOG").ok(), config);

  let (writer, guard) = tracing_appender::non_blocking(rolling::daily(&log_dir, LOG_FILE_PREFIX));
  let file_layer = tracing_subscriber::fmt::layer()
    .with_writer(writer)
    .with_ansi(false)
    .with_target(true)
    .with_filter(EnvFilter::new(&directives));

  let stderr_layer = verbose.then(|| {
    tracing_subscriber::fmt::layer()
      .with_writer(std::io::stderr)
      .with_target(false)
      .with_filter(EnvFilter::new(&directives))
  });

  Registry::default()
    .with(file_layer)
    .with(stderr_layer)
    .try_init()
    .map_err(|e| eyre!("Failed to install tracing subscriber: {}", e))?;

  Ok(LoggingGuard {
    _file_guard: guard,
    log_dir,
  })
}

/// `RUST_LOG` wins, then the config file, then `info`.
fn filter_directives(env: Option<String>, config: &Config) -> String {
  env
    .filter(|s| !s.trim().is_empty())
    .or_else(|| config.logging.filter.clone())
    .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_filter_precedence() {
    let mut config = Config::default();
    assert_eq!(filter_directives(None, &config), "info");

    config.logging.filter = Some("motivue_sync=debug".to_string());
    assert_eq!(filter_directives(None, &config), "motivue_sync=debug");
    assert_eq!(filter_directives(Some(" ".to_string()), &config), "motivue_sync=debug");
    assert_eq!(filter_directives(Some("warn".to_string()), &config), "warn");
  }
}
