use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  /// Custom title for header (defaults to "contactbook")
  pub title: Option<String>,
  #[serde(default)]
  pub store: StoreConfig,
  #[serde(default)]
  pub assets: AssetsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
  /// Database name; the file is `<name>.sqlite3` in the data directory
  #[serde(default = "default_store_name")]
  pub name: String,
  /// Schema version. Raising it runs the upgrade step once.
  #[serde(default = "default_schema_version")]
  pub version: u32,
  /// Explicit database file, overrides the name-derived location
  pub path: Option<PathBuf>,
}

impl Default for StoreConfig {
  fn default() -> Self {
    Self {
      name: default_store_name(),
      version: default_schema_version(),
      path: None,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetsConfig {
  /// Base URL the manifest paths are fetched from
  pub origin: Option<String>,
  /// Generation tag of the current cache
  #[serde(default = "default_cache_name")]
  pub cache_name: String,
  /// Paths cached verbatim at install time
  #[serde(
    default = "default_manifest",
    deserialize_with = "deserialize_manifest"
  )]
  pub manifest: Vec<String>,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
  /// Explicit cache database file
  pub path: Option<PathBuf>,
}

impl Default for AssetsConfig {
  fn default() -> Self {
    Self {
      origin: None,
      cache_name: default_cache_name(),
      manifest: default_manifest(),
      timeout_secs: default_timeout_secs(),
      path: None,
    }
  }
}

impl AssetsConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }

  pub fn origin(&self) -> Result<&str> {
    self
      .origin
      .as_deref()
      .ok_or_else(|| eyre!("assets.origin is not configured"))
  }
}

fn default_store_name() -> String {
  "Users_Table".to_string()
}

fn default_schema_version() -> u32 {
  12
}

fn default_cache_name() -> String {
  "indexDB-v1".to_string()
}

fn default_timeout_secs() -> u64 {
  10
}

fn default_manifest() -> Vec<String> {
  [
    "/index.html",
    "/css/bootstrap-grid.min.css",
    "/css/bootstrap-reboot.min.css",
    "/css/bootstrap-utilities.min.css",
    "/css/bootstrap.min.css",
    "/css/style.css",
    "/js/base.js",
    "/js/script.js",
  ]
  .iter()
  .map(|p| p.to_string())
  .collect()
}

fn deserialize_manifest<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
  D: serde::Deserializer<'de>,
{
  let v: Vec<String> = Vec::deserialize(deserializer)?;
  Ok(v.iter().map(|p| normalize_path(p)).collect())
}

/// Manifest paths are origin-relative and always start with a slash.
pub fn normalize_path(path: &str) -> String {
  let trimmed = path.trim();
  if trimmed.starts_with('/') {
    trimmed.to_string()
  } else {
    format!("/{}", trimmed)
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./contactbook.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/contactbook/config.yaml
  ///
  /// Falls back to built-in defaults when no file exists.
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
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("contactbook.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("contactbook").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    if config.store.version == 0 {
      return Err(eyre!("store.version must be at least 1"));
    }
    Ok(config)
  }

  /// Directory holding the databases and the log file.
  pub fn data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("contactbook"))
  }

  pub fn store_path(&self) -> Result<PathBuf> {
    match &self.store.path {
      Some(p) => Ok(p.clone()),
      None => Ok(Self::data_dir()?.join(format!("{}.sqlite3", self.store.name))),
    }
  }

  pub fn asset_cache_path(&self) -> Result<PathBuf> {
    match &self.assets.path {
      Some(p) => Ok(p.clone()),
      None => Ok(Self::data_dir()?.join("asset-cache.sqlite3")),
    }
  }

  pub fn title(&self) -> &str {
    self.title.as_deref().unwrap_or("contactbook")
  }
}
