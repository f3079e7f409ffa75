//! Core types for the asset cache.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// A response as seen by the cache, independent of the HTTP client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetResponse {
  pub status: u16,
  pub headers: Vec<(String, String)>,
  pub body: Vec<u8>,
}

impl AssetResponse {
  pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
    Self {
      status,
      headers: Vec::new(),
      body: body.into(),
    }
  }

  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }

  /// Hex SHA-256 of the body.
  pub fn digest(&self) -> String {
    hex::encode(Sha256::digest(&self.body))
  }
}

/// A stored entry of one cache generation.
#[derive(Debug, Clone)]
pub struct CachedAsset {
  pub path: String,
  pub response: AssetResponse,
  pub digest: String,
  pub cached_at: DateTime<Utc>,
}

/// The request never produced a response: refused, reset, timed out.
#[derive(Debug, Clone, Error)]
#[error("network error: {0}")]
pub struct NetworkError(pub String);

/// Result of a fetch, including where the response came from.
#[derive(Debug, Clone)]
pub struct Served {
  pub response: AssetResponse,
  pub source: ServedFrom,
  /// When the response was cached (if from cache)
  pub cached_at: Option<DateTime<Utc>>,
}

impl Served {
  pub fn from_network(response: AssetResponse) -> Self {
    Self {
      response,
      source: ServedFrom::Network,
      cached_at: None,
    }
  }

  pub fn from_cache(asset: CachedAsset) -> Self {
    Self {
      response: asset.response,
      source: ServedFrom::Cache,
      cached_at: Some(asset.cached_at),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServedFrom {
  Network,
  /// Network unavailable, served from the active generation
  Cache,
}

/// Lifecycle of the current cache generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
  /// Nothing installed for the current tag
  Idle,
  Installing,
  Installed,
  Activating,
  Active,
  /// Last install or activation failed
  Failed,
}

impl std::fmt::Display for Lifecycle {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let s = match self {
      Lifecycle::Idle => "idle",
      Lifecycle::Installing => "installing",
      Lifecycle::Installed => "installed",
      Lifecycle::Activating => "activating",
      Lifecycle::Active => "active",
      Lifecycle::Failed => "failed",
    };
    f.write_str(s)
  }
}

#[derive(Debug, Error)]
pub enum AssetError {
  #[error("install of {generation} aborted at {path}: {reason}")]
  Install {
    generation: String,
    path: String,
    reason: String,
  },

  #[error("generation {0} is not installed")]
  NotInstalled(String),

  #[error("{path} unavailable offline: {source}")]
  Offline {
    path: String,
    #[source]
    source: NetworkError,
  },

  #[error(transparent)]
  Network(#[from] NetworkError),

  #[error("failed to open asset cache at {path}: {reason}")]
  Open { path: String, reason: String },

  #[error("asset cache lock poisoned")]
  Poisoned,

  #[error(transparent)]
  Sqlite(#[from] rusqlite::Error),

  #[error(transparent)]
  Serialization(#[from] serde_json::Error),
}

pub type AssetResult<T> = std::result::Result<T, AssetError>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_success_range() {
    assert!(AssetResponse::new(200, "ok").is_success());
    assert!(AssetResponse::new(204, "").is_success());
    assert!(!AssetResponse::new(304, "").is_success());
    assert!(!AssetResponse::new(404, "missing").is_success());
  }

  #[test]
  fn test_digest_of_empty_body() {
    assert_eq!(
      AssetResponse::new(200, "").digest(),
      "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
  }
}
