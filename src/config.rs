use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::api::mock::SAMPLE_USER_ID;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  /// Backend origin, e.g. http://127.0.0.1:8000
  pub base_url: String,
  /// Bearer token for protected routes. Usually supplied via MOTIVUE_API_TOKEN instead.
  pub bearer_token: Option<String>,
  /// Serve the built-in sample data instead of calling the backend
  pub use_mock: bool,
  /// User every request is made for: the baseline path and the `user_id` of each body
  pub user_id: String,
  pub connect_timeout_secs: u64,
  pub timeout_secs: u64,
  /// JSON files holding the POST bodies. Unset entries use the built-in samples.
  pub requests: RequestFiles,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RequestFiles {
  pub consumption: Option<PathBuf>,
  pub weekly_report: Option<PathBuf>,
  pub physio_age: Option<PathBuf>,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: DEFAULT_BASE_URL.to_string(),
      bearer_token: None,
      use_mock: true,
      user_id: SAMPLE_USER_ID.to_string(),
      connect_timeout_secs: 5,
      timeout_secs: 30,
      requests: RequestFiles::default(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// Disable the on-disk cache entirely
  pub enabled: bool,
  /// Parent directory for the cache namespace (default: platform cache dir)
  pub dir: Option<PathBuf>,
  /// Age after which a snapshot is reported as stale. Stale data is still served.
  pub stale_after_minutes: i64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      dir: None,
      stale_after_minutes: 30,
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
  /// Directory for rolling log files (default: platform data dir)
  pub dir: Option<PathBuf>,
  /// Filter directive used when RUST_LOG is unset, e.g. "motivue_sync=debug"
  pub filter: Option<String>,
}

impl Config {
  /// Load configuration from file, then apply environment overrides.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./motivue.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/motivue/config.yaml
  ///
  /// Every setting has a default, so running without a file is fine.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config::default(),
    };
    config.apply_env(|name| std::env::var(name).ok())?;

    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("motivue.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("motivue").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn from_yaml(contents: &str) -> Result<Self> {
    // An empty file deserializes to unit, not to a struct
    if contents.trim().is_empty() {
      return Ok(Config::default());
    }
    Ok(serde_yaml::from_str(contents)?)
  }

  /// Apply per-environment overrides.
  ///
  /// Checks MOTIVUE_BASE_URL, MOTIVUE_API_TOKEN and MOTIVUE_USE_MOCK.
  fn apply_env<F>(&mut self, var: F) -> Result<()>
  where
    F: Fn(&str) -> Option<String>,
  {
    if let Some(url) = var("MOTIVUE_BASE_URL") {
      self.api.base_url = url;
    }
    if let Some(token) = var("MOTIVUE_API_TOKEN").filter(|t| !t.is_empty()) {
      self.api.bearer_token = Some(token);
    }
    if let Some(flag) = var("MOTIVUE_USE_MOCK") {
      self.api.use_mock = parse_bool(&flag)
        .ok_or_else(|| eyre!("MOTIVUE_USE_MOCK must be true or false, got {:?}", flag))?;
    }
    Ok(())
  }

  /// Root directory for cached resources.
  pub fn cache_dir(&self) -> Result<PathBuf> {
    let parent = match &self.cache.dir {
      Some(dir) => dir.clone(),
      None => dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|p| p.join(".cache")))
        .ok_or_else(|| eyre!("Could not determine cache directory"))?,
    };
    Ok(parent.join("motivue-cache"))
  }

  /// Directory for log files.
  pub fn log_dir(&self) -> Result<PathBuf> {
    match &self.logging.dir {
      Some(dir) => Ok(dir.clone()),
      None => {
        let data_dir = dirs::data_dir()
          .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
          .ok_or_else(|| eyre!("Could not determine data directory"))?;
        Ok(data_dir.join("motivue").join("logs"))
      }
    }
  }
}

fn parse_bool(s: &str) -> Option<bool> {
  match s.trim().to_lowercase().as_str() {
    "1" | "true" | "yes" | "on" => Some(true),
    "0" | "false" | "no" | "off" => Some(false),
    _ => None,
  }
}
