use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::cache::SqliteStore;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub sync: SyncConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Backend origin, e.g. "https://erp.example.com"
  pub url: String,
  /// Per-request timeout in seconds
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
  30
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfig {
  /// Database file (defaults to $XDG_DATA_HOME/ledgersync/cache.db)
  pub path: Option<PathBuf>,
}

impl CacheConfig {
  /// Resolve the database path, falling back to the platform data directory.
  pub fn database_path(&self) -> Result<PathBuf> {
    match &self.path {
      Some(path) => Ok(path.clone()),
      None => SqliteStore::default_path().ok_or_else(|| eyre!("Could not determine data directory")),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
  /// Start a drain in the background after every enqueue
  #[serde(default = "default_auto_flush")]
  pub auto_flush: bool,
}

fn default_auto_flush() -> bool {
  true
}

impl Default for SyncConfig {
  fn default() -> Self {
    Self {
      auto_flush: default_auto_flush(),
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./ledgersync.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/ledgersync/config.yaml
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

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/ledgersync/config.yaml"
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("ledgersync.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("ledgersync").join("config.yaml");
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

  /// Parse configuration from YAML text.
  pub fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    Ok(config)
  }

  /// Directory for log files, next to the default cache location.
  pub fn log_dir() -> Option<PathBuf> {
    dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .map(|dir| dir.join("ledgersync").join("logs"))
  }

  /// Get the API bearer token from environment variables.
  ///
  /// Checks LEDGERSYNC_TOKEN first, then LEDGERSYNC_API_TOKEN as fallback.
  pub fn get_api_token() -> Result<String> {
    std::env::var("LEDGERSYNC_TOKEN")
      .or_else(|_| std::env::var("LEDGERSYNC_API_TOKEN"))
      .map_err(|_| {
        eyre!("API token not found. Set LEDGERSYNC_TOKEN or LEDGERSYNC_API_TOKEN environment variable.")
      })
  }
}
