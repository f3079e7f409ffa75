//! Async facade over `Database`.
//!
//! SQLite calls block, so every operation runs on tokio's blocking pool
//! and resolves exactly once with a `StoreResult`.

use std::path::PathBuf;
use tracing::{error, info};

use super::{Database, StoreError, StoreResult, UserRecord};

/// Record store gateway handed to whoever needs the users collection.
#[derive(Clone)]
pub struct UserStore {
  db: Database,
}

impl UserStore {
  /// Open the store at `path`. Failures are logged and returned.
  pub async fn open(path: PathBuf, version: u32) -> StoreResult<Self> {
    let result = tokio::task::spawn_blocking(move || Database::open(&path, version))
      .await
      .map_err(|e| StoreError::Task(e.to_string()))
      .and_then(|r| r);

    match result {
      Ok(db) => {
        info!(location = %db.location().display(), version = db.version(), "record store open");
        Ok(Self { db })
      }
      Err(e) => {
        error!(error = %e, "failed to open record store");
        Err(e)
      }
    }
  }

  pub fn from_database(db: Database) -> Self {
    Self { db }
  }

  #[cfg(test)]
  pub fn database(&self) -> &Database {
    &self.db
  }

  async fn run<T, F>(&self, op: F) -> StoreResult<T>
  where
    T: Send + 'static,
    F: FnOnce(&Database) -> StoreResult<T> + Send + 'static,
  {
    let db = self.db.clone();
    tokio::task::spawn_blocking(move || op(&db))
      .await
      .map_err(|e| StoreError::Task(e.to_string()))?
  }

  pub async fn insert(&self, record: UserRecord) -> StoreResult<()> {
    self.run(move |db| db.insert_user(&record)).await
  }

  pub async fn replace(&self, record: UserRecord) -> StoreResult<()> {
    self.run(move |db| db.replace_user(&record)).await
  }

  pub async fn delete(&self, id: &str) -> StoreResult<()> {
    let id = id.to_string();
    self.run(move |db| db.delete_user(&id)).await
  }

  pub async fn get(&self, id: &str) -> StoreResult<Option<UserRecord>> {
    let id = id.to_string();
    self.run(move |db| db.get_user(&id)).await
  }

  pub async fn list(&self) -> StoreResult<Vec<UserRecord>> {
    self.run(|db| db.list_users()).await
  }

  pub async fn count(&self) -> StoreResult<usize> {
    self.run(|db| db.count_users()).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn store() -> UserStore {
    UserStore::from_database(Database::open_in_memory(1).unwrap())
  }

  fn record(id: &str) -> UserRecord {
    UserRecord::new(id, "Alan", "Turing", "alan@example.com", "0161")
  }

  #[tokio::test]
  async fn test_async_round_trip() {
    let store = store();
    store.insert(record("a")).await.unwrap();
    assert_eq!(store.get("a").await.unwrap(), Some(record("a")));
    assert_eq!(store.count().await.unwrap(), 1);
    assert_eq!(store.list().await.unwrap(), vec![record("a")]);
  }

  #[tokio::test]
  async fn test_count_tracks_inserts_minus_deletes() {
    let store = store();
    for i in 0..4 {
      store.insert(record(&i.to_string())).await.unwrap();
    }
    store.delete("0").await.unwrap();
    assert_eq!(store.count().await.unwrap(), 3);
  }

  #[tokio::test]
  async fn test_duplicate_insert_reports_error() {
    let store = store();
    store.insert(record("dup")).await.unwrap();
    assert!(matches!(
      store.insert(record("dup")).await,
      Err(StoreError::DuplicateId(_))
    ));
  }

  #[tokio::test]
  async fn test_open_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Users_Table.sqlite3");

    let store = UserStore::open(path.clone(), 12).await.unwrap();
    store.replace(record("x")).await.unwrap();
    assert_eq!(store.database().location(), path.as_path());
    assert_eq!(store.database().version(), 12);
  }

  #[tokio::test]
  async fn test_open_failure_is_returned() {
    let dir = tempfile::tempdir().unwrap();
    // A directory cannot be opened as a database file
    let result = UserStore::open(dir.path().to_path_buf(), 1).await;
    assert!(result.is_err());
  }
}
