//! Versioned local record store.
//!
//! `Database` owns the SQLite connection and the schema version handshake.
//! `users` adds the CRUD operations over the users collection and
//! `gateway` exposes them asynchronously.

mod error;
mod gateway;
pub mod schema;
mod users;

pub use error::{StoreError, StoreResult};
pub use gateway::UserStore;
pub use users::UserRecord;

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/// Handle to an open record store. Cloning shares the connection.
#[derive(Clone)]
pub struct Database {
  conn: Arc<Mutex<Connection>>,
  location: PathBuf,
  version: u32,
}

impl Database {
  /// Open or create the database file at `path` with schema `version`.
  pub fn open(path: &Path, version: u32) -> StoreResult<Self> {
    if version == 0 {
      return Err(StoreError::InvalidVersion);
    }

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      if !parent.as_os_str().is_empty() {
        std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
          path: parent.to_path_buf(),
          source,
        })?;
      }
    }

    let conn = Connection::open(path).map_err(|source| StoreError::Open {
      path: path.to_path_buf(),
      source,
    })?;

    Self::from_connection(conn, path.to_path_buf(), version)
  }

  /// Open a private in-memory database, used by tests.
  #[cfg(test)]
  pub fn open_in_memory(version: u32) -> StoreResult<Self> {
    if version == 0 {
      return Err(StoreError::InvalidVersion);
    }
    let conn = Connection::open_in_memory().map_err(|source| StoreError::Open {
      path: PathBuf::from(":memory:"),
      source,
    })?;
    Self::from_connection(conn, PathBuf::from(":memory:"), version)
  }

  fn from_connection(mut conn: Connection, location: PathBuf, version: u32) -> StoreResult<Self> {
    let stored = stored_version(&conn)?;

    if version < stored {
      return Err(StoreError::VersionTooLow {
        requested: version,
        stored,
      });
    }

    if version > stored {
      upgrade(&mut conn, stored, version)?;
    } else {
      debug!(version, path = %location.display(), "schema up to date");
    }

    Ok(Self {
      conn: Arc::new(Mutex::new(conn)),
      location,
      version,
    })
  }

  /// Schema version this handle was opened with.
  pub fn version(&self) -> u32 {
    self.version
  }

  pub fn location(&self) -> &Path {
    &self.location
  }

  pub(crate) fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
    self.conn.lock().map_err(|_| StoreError::Poisoned)
  }
}

fn stored_version(conn: &Connection) -> StoreResult<u32> {
  let version: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
  Ok(version)
}

/// Run the upgrade step exactly once, inside a single transaction.
fn upgrade(conn: &mut Connection, from: u32, to: u32) -> StoreResult<()> {
  let wrap = |source| StoreError::Upgrade { from, to, source };

  let tx = conn.transaction().map_err(wrap)?;
  tx.execute_batch(schema::CREATE_USERS).map_err(wrap)?;
  tx.pragma_update(None, "user_version", to).map_err(wrap)?;
  tx.commit().map_err(wrap)?;

  info!(from, to, collection = schema::USERS, "schema upgraded");
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn table_exists(db: &Database, name: &str) -> bool {
    let conn = db.lock().unwrap();
    conn
      .query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        [name],
        |row| row.get::<_, i64>(0),
      )
      .unwrap()
      == 1
  }

  #[test]
  fn test_open_creates_users_collection() {
    let db = Database::open_in_memory(1).unwrap();
    assert!(table_exists(&db, schema::USERS));
    assert_eq!(db.version(), 1);
  }

  #[test]
  fn test_zero_version_rejected() {
    assert!(matches!(
      Database::open_in_memory(0),
      Err(StoreError::InvalidVersion)
    ));
  }

  #[test]
  fn test_version_bump_keeps_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Users_Table.sqlite3");

    let db = Database::open(&path, 1).unwrap();
    db.insert_user(&UserRecord::new("a", "Ada", "Lovelace", "ada@example.com", "12345"))
      .unwrap();
    drop(db);

    let db = Database::open(&path, 12).unwrap();
    assert_eq!(db.version(), 12);
    assert_eq!(db.count_users().unwrap(), 1);

    let conn = db.lock().unwrap();
    assert_eq!(stored_version(&conn).unwrap(), 12);
  }

  #[test]
  fn test_reopen_same_version() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.sqlite3");

    drop(Database::open(&path, 3).unwrap());
    let db = Database::open(&path, 3).unwrap();
    assert!(table_exists(&db, schema::USERS));
  }

  #[test]
  fn test_lower_version_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.sqlite3");

    drop(Database::open(&path, 5).unwrap());
    let err = Database::open(&path, 4).err().unwrap();
    assert!(matches!(
      err,
      StoreError::VersionTooLow {
        requested: 4,
        stored: 5
      }
    ));
  }

  #[test]
  fn test_creates_parent_directory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("data").join("db.sqlite3");

    Database::open(&path, 1).unwrap();
    assert!(path.exists());
  }
}
