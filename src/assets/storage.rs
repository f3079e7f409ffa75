//! Asset storage trait and SQLite implementation.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

use super::traits::{AssetError, AssetResponse, AssetResult, CachedAsset};

/// Trait for asset cache storage backends.
pub trait AssetStorage: Send + Sync {
  /// Store every entry of a generation in one step, replacing any
  /// previous entries for that generation.
  fn store_generation(&self, generation: &str, entries: &[(String, AssetResponse)]) -> AssetResult<()>;

  /// All stored generation tags.
  fn generations(&self) -> AssetResult<Vec<String>>;

  fn has_generation(&self, generation: &str) -> AssetResult<bool>;

  /// Delete a generation and all of its entries.
  fn delete_generation(&self, generation: &str) -> AssetResult<bool>;

  fn match_asset(&self, generation: &str, path: &str) -> AssetResult<Option<CachedAsset>>;

  fn entry_count(&self, generation: &str) -> AssetResult<usize>;

  fn active_generation(&self) -> AssetResult<Option<String>>;

  fn set_active_generation(&self, generation: &str) -> AssetResult<()>;
}

/// SQLite-based asset storage implementation.
pub struct SqliteAssetStorage {
  conn: Mutex<Connection>,
}

impl SqliteAssetStorage {
  pub fn open(path: &Path) -> AssetResult<Self> {
    let open_err = |reason: String| AssetError::Open {
      path: path.display().to_string(),
      reason,
    };

    if let Some(parent) = path.parent() {
      if !parent.as_os_str().is_empty() {
        std::fs::create_dir_all(parent).map_err(|e| open_err(e.to_string()))?;
      }
    }

    let conn = Connection::open(path).map_err(|e| open_err(e.to_string()))?;
    Self::from_connection(conn)
  }

  #[cfg(test)]
  pub fn open_in_memory() -> AssetResult<Self> {
    Self::from_connection(Connection::open_in_memory()?)
  }

  fn from_connection(conn: Connection) -> AssetResult<Self> {
    conn.execute_batch(ASSET_SCHEMA)?;
    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  fn lock(&self) -> AssetResult<std::sync::MutexGuard<'_, Connection>> {
    self.conn.lock().map_err(|_| AssetError::Poisoned)
  }

  /// Overwrite the stored body of an entry, leaving its digest alone.
  #[cfg(test)]
  pub(crate) fn corrupt_body(&self, generation: &str, path: &str, body: &[u8]) -> AssetResult<()> {
    let conn = self.lock()?;
    conn.execute(
      "UPDATE cache_entries SET body = ? WHERE generation = ? AND path = ?",
      params![body, generation, path],
    )?;
    Ok(())
  }
}

const ASSET_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS cache_generations (
    name TEXT PRIMARY KEY,
    installed_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS cache_entries (
    generation TEXT NOT NULL,
    path TEXT NOT NULL,
    status INTEGER NOT NULL,
    headers TEXT NOT NULL,
    body BLOB NOT NULL,
    digest TEXT NOT NULL,
    cached_at TEXT NOT NULL,
    PRIMARY KEY (generation, path)
);

CREATE TABLE IF NOT EXISTS cache_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

const ACTIVE_KEY: &str = "active_generation";

impl AssetStorage for SqliteAssetStorage {
  fn store_generation(&self, generation: &str, entries: &[(String, AssetResponse)]) -> AssetResult<()> {
    let mut conn = self.lock()?;
    let now = Utc::now().to_rfc3339();

    let tx = conn.transaction()?;
    tx.execute(
      "INSERT OR REPLACE INTO cache_generations (name, installed_at) VALUES (?, ?)",
      params![generation, now],
    )?;
    tx.execute(
      "DELETE FROM cache_entries WHERE generation = ?",
      params![generation],
    )?;

    for (path, response) in entries {
      let headers = serde_json::to_string(&response.headers)?;
      tx.execute(
        "INSERT OR REPLACE INTO cache_entries (generation, path, status, headers, body, digest, cached_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        params![
          generation,
          path,
          response.status,
          headers,
          response.body,
          response.digest(),
          now
        ],
      )?;
    }

    tx.commit()?;
    Ok(())
  }

  fn generations(&self) -> AssetResult<Vec<String>> {
    let conn = self.lock()?;
    let mut stmt = conn.prepare("SELECT name FROM cache_generations ORDER BY installed_at")?;
    let names = stmt
      .query_map([], |row| row.get(0))?
      .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(names)
  }

  fn has_generation(&self, generation: &str) -> AssetResult<bool> {
    let conn = self.lock()?;
    let found: Option<i64> = conn
      .query_row(
        "SELECT 1 FROM cache_generations WHERE name = ?",
        params![generation],
        |row| row.get(0),
      )
      .optional()?;
    Ok(found.is_some())
  }

  fn delete_generation(&self, generation: &str) -> AssetResult<bool> {
    let mut conn = self.lock()?;
    let tx = conn.transaction()?;
    tx.execute(
      "DELETE FROM cache_entries WHERE generation = ?",
      params![generation],
    )?;
    let removed = tx.execute(
      "DELETE FROM cache_generations WHERE name = ?",
      params![generation],
    )?;
    tx.execute(
      "DELETE FROM cache_meta WHERE key = ? AND value = ?",
      params![ACTIVE_KEY, generation],
    )?;
    tx.commit()?;
    Ok(removed > 0)
  }

  fn match_asset(&self, generation: &str, path: &str) -> AssetResult<Option<CachedAsset>> {
    let conn = self.lock()?;
    let row: Option<(u16, String, Vec<u8>, String, String)> = conn
      .query_row(
        "SELECT status, headers, body, digest, cached_at FROM cache_entries
         WHERE generation = ? AND path = ?",
        params![generation, path],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
      )
      .optional()?;

    match row {
      Some((status, headers, body, digest, cached_at)) => Ok(Some(CachedAsset {
        path: path.to_string(),
        response: AssetResponse {
          status,
          headers: serde_json::from_str(&headers)?,
          body,
        },
        digest,
        cached_at: parse_datetime(&cached_at),
      })),
      None => Ok(None),
    }
  }

  fn entry_count(&self, generation: &str) -> AssetResult<usize> {
    let conn = self.lock()?;
    let count: i64 = conn.query_row(
      "SELECT COUNT(*) FROM cache_entries WHERE generation = ?",
      params![generation],
      |row| row.get(0),
    )?;
    Ok(usize::try_from(count).unwrap_or_default())
  }

  fn active_generation(&self) -> AssetResult<Option<String>> {
    let conn = self.lock()?;
    let value = conn
      .query_row(
        "SELECT value FROM cache_meta WHERE key = ?",
        params![ACTIVE_KEY],
        |row| row.get(0),
      )
      .optional()?;
    Ok(value)
  }

  fn set_active_generation(&self, generation: &str) -> AssetResult<()> {
    let conn = self.lock()?;
    conn.execute(
      "INSERT OR REPLACE INTO cache_meta (key, value) VALUES (?, ?)",
      params![ACTIVE_KEY, generation],
    )?;
    Ok(())
  }
}

/// Timestamps are written as RFC 3339; anything unreadable maps to the epoch.
fn parse_datetime(s: &str) -> DateTime<Utc> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn entries() -> Vec<(String, AssetResponse)> {
    vec![
      ("/index.html".to_string(), AssetResponse::new(200, "<html></html>")),
      ("/css/style.css".to_string(), AssetResponse::new(200, "body {}")),
    ]
  }

  #[test]
  fn test_store_and_match() {
    let storage = SqliteAssetStorage::open_in_memory().unwrap();
    storage.store_generation("v1", &entries()).unwrap();

    let hit = storage.match_asset("v1", "/index.html").unwrap().unwrap();
    assert_eq!(hit.response.body, b"<html></html>".to_vec());
    assert_eq!(hit.digest, hit.response.digest());
    assert!(storage.match_asset("v1", "/missing.js").unwrap().is_none());
    assert!(storage.match_asset("v2", "/index.html").unwrap().is_none());
    assert_eq!(storage.entry_count("v1").unwrap(), 2);
  }

  #[test]
  fn test_restore_replaces_entries() {
    let storage = SqliteAssetStorage::open_in_memory().unwrap();
    storage.store_generation("v1", &entries()).unwrap();
    storage
      .store_generation("v1", &[("/index.html".to_string(), AssetResponse::new(200, "new"))])
      .unwrap();

    assert_eq!(storage.entry_count("v1").unwrap(), 1);
    assert_eq!(storage.generations().unwrap(), vec!["v1"]);
  }

  #[test]
  fn test_headers_round_trip() {
    let storage = SqliteAssetStorage::open_in_memory().unwrap();
    let mut response = AssetResponse::new(200, "x");
    response.headers = vec![("content-type".to_string(), "text/css".to_string())];
    storage
      .store_generation("v1", &[("/a.css".to_string(), response.clone())])
      .unwrap();

    let hit = storage.match_asset("v1", "/a.css").unwrap().unwrap();
    assert_eq!(hit.response, response);
  }

  #[test]
  fn test_delete_generation_clears_active_marker() {
    let storage = SqliteAssetStorage::open_in_memory().unwrap();
    storage.store_generation("v1", &entries()).unwrap();
    storage.set_active_generation("v1").unwrap();

    assert!(storage.delete_generation("v1").unwrap());
    assert!(!storage.delete_generation("v1").unwrap());
    assert!(storage.active_generation().unwrap().is_none());
    assert_eq!(storage.entry_count("v1").unwrap(), 0);
    assert!(!storage.has_generation("v1").unwrap());
  }

  #[test]
  fn test_open_file_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache").join("assets.sqlite3");

    let storage = SqliteAssetStorage::open(&path).unwrap();
    storage.store_generation("v1", &entries()).unwrap();
    storage.set_active_generation("v1").unwrap();
    drop(storage);

    let storage = SqliteAssetStorage::open(&path).unwrap();
    assert_eq!(storage.active_generation().unwrap().as_deref(), Some("v1"));
    assert!(storage.has_generation("v1").unwrap());
  }
}
