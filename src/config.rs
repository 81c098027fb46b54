use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides `api.base_url`.
pub const API_URL_ENV: &str = "SCHOOLADM_API_URL";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  /// Rows per page in list views
  #[serde(default = "default_page_size")]
  pub page_size: u32,
  /// Custom title for header (defaults to "schooladm")
  pub title: Option<String>,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  pub base_url: String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

impl ApiConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Keep cache in memory only, nothing written to disk
  #[serde(default)]
  pub in_memory: bool,
  #[serde(default = "default_list_stale_secs")]
  pub list_stale_secs: i64,
  #[serde(default = "default_detail_stale_secs")]
  pub detail_stale_secs: i64,
  /// SQLite file (default: $XDG_DATA_HOME/schooladm/cache.db)
  pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      in_memory: false,
      list_stale_secs: default_list_stale_secs(),
      detail_stale_secs: default_detail_stale_secs(),
      path: None,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
  /// Filter directive, overridden by RUST_LOG
  #[serde(default = "default_log_level")]
  pub level: String,
  /// Log directory (default: $XDG_DATA_HOME/schooladm/logs)
  pub directory: Option<PathBuf>,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
      directory: None,
    }
  }
}

fn default_page_size() -> u32 {
  10
}

fn default_timeout_secs() -> u64 {
  30
}

fn default_true() -> bool {
  true
}

fn default_list_stale_secs() -> i64 {
  40
}

fn default_detail_stale_secs() -> i64 {
  30
}

fn default_log_level() -> String {
  "info".to_string()
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./schooladm.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/schooladm/config.yaml
  ///
  /// `api_url` (the `--api-url` flag) beats `SCHOOLADM_API_URL`, which beats
  /// the file. With no file, either URL alone is enough to run.
  pub fn load(explicit_path: Option<&Path>, api_url: Option<String>) -> Result<Self> {
    let env_url = api_url
      .or_else(|| std::env::var(API_URL_ENV).ok())
      .filter(|u| !u.is_empty());

    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let config = match (path, env_url.as_deref()) {
      (Some(p), _) => Self::load_from_path(&p)?,
      (None, Some(url)) => Self::with_base_url(url),
      (None, None) => {
        return Err(eyre!(
          "No configuration file found. Create one at ~/.config/schooladm/config.yaml\n\
           or set {} to the API base URL.",
          API_URL_ENV
        ))
      }
    };

    config.with_api_url_override(env_url).validated()
  }

  /// Defaults pointed at `base_url`.
  pub fn with_base_url(base_url: &str) -> Self {
    Self {
      api: ApiConfig {
        base_url: base_url.to_string(),
        timeout_secs: default_timeout_secs(),
      },
      page_size: default_page_size(),
      title: None,
      cache: CacheConfig::default(),
      log: LogConfig::default(),
    }
  }

  pub fn from_yaml(contents: &str) -> Result<Self> {
    serde_yaml::from_str(contents).map_err(|e| eyre!("Failed to parse config: {}", e))
  }

  pub fn with_api_url_override(mut self, url: Option<String>) -> Self {
    if let Some(url) = url {
      self.api.base_url = url;
    }
    self
  }

  fn validated(self) -> Result<Self> {
    if self.page_size == 0 {
      return Err(eyre!("page_size must be at least 1"));
    }
    if self.api.base_url.trim().is_empty() {
      return Err(eyre!("api.base_url must not be empty"));
    }
    Ok(self)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("schooladm.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("schooladm").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  /// Header title
  pub fn title(&self) -> &str {
    self.title.as_deref().unwrap_or("schooladm")
  }

  /// Directory for log files
  pub fn log_directory(&self) -> PathBuf {
    self.log.directory.clone().unwrap_or_else(|| {
      dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("schooladm")
        .join("logs")
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  #[test]
  fn test_minimal_config_gets_defaults() {
    let config = Config::from_yaml("api:\n  base_url: http://localhost:3000/api\n").unwrap();
    assert_eq!(config.page_size, 10);
    assert_eq!(config.api.timeout(), Duration::from_secs(30));
    assert!(config.cache.enabled);
    assert_eq!(config.cache.list_stale_secs, 40);
    assert_eq!(config.cache.detail_stale_secs, 30);
    assert_eq!(config.log.level, "info");
    assert_eq!(config.title(), "schooladm");
  }

  #[test]
  fn test_full_config() {
    let yaml = r#"
api:
  base_url: https://school.example.com/api
  timeout_secs: 5
page_size: 25
title: North High
cache:
  enabled: false
  list_stale_secs: 10
log:
  level: debug
  directory: /tmp/schooladm-logs
"#;
    let config = Config::from_yaml(yaml).unwrap();
    assert_eq!(config.page_size, 25);
    assert!(!config.cache.enabled);
    assert_eq!(config.cache.list_stale_secs, 10);
    assert_eq!(config.cache.detail_stale_secs, 30);
    assert_eq!(config.title(), "North High");
    assert_eq!(config.log_directory(), PathBuf::from("/tmp/schooladm-logs"));
  }

  #[test]
  fn test_missing_api_section_is_an_error() {
    assert!(Config::from_yaml("page_size: 10\n").is_err());
  }

  #[test]
  fn test_env_override_replaces_base_url() {
    let config = Config::with_base_url("http://a/")
      .with_api_url_override(Some("http://b/".to_string()));
    assert_eq!(config.api.base_url, "http://b/");

    let config = Config::with_base_url("http://a/").with_api_url_override(None);
    assert_eq!(config.api.base_url, "http://a/");
  }

  #[test]
  fn test_load_explicit_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "api:\n  base_url: http://localhost:9000/\npage_size: 0").unwrap();

    let err = Config::load(Some(file.path()), None).unwrap_err();
    assert!(err.to_string().contains("page_size"));

    assert!(Config::load(Some(Path::new("/definitely/not/here.yaml")), None).is_err());
  }

  #[test]
  fn test_flag_url_beats_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "api:\n  base_url: http://file.example/\npage_size: 5").unwrap();

    let config = Config::load(Some(file.path()), Some("http://flag.example/".to_string())).unwrap();
    assert_eq!(config.api.base_url, "http://flag.example/");
    assert_eq!(config.page_size, 5);
  }
}
