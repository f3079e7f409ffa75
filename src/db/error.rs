use std::path::PathBuf;
use thiserror::Error;

/// Every failure the record store can report.
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("failed to create database directory {}: {source}", path.display())]
  CreateDir {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to open database at {}: {source}", path.display())]
  Open {
    path: PathBuf,
    #[source]
    source: rusqlite::Error,
  },

  #[error("schema version must be at least 1")]
  InvalidVersion,

  #[error("requested schema version {requested} is lower than stored version {stored}")]
  VersionTooLow { requested: u32, stored: u32 },

  #[error("failed to upgrade schema from version {from} to {to}: {source}")]
  Upgrade {
    from: u32,
    to: u32,
    #[source]
    source: rusqlite::Error,
  },

  #[error("a record with id {0} already exists")]
  DuplicateId(String),

  #[error("database lock poisoned")]
  Poisoned,

  #[error("store task did not complete: {0}")]
  Task(String),

  #[error(transparent)]
  Sqlite(#[from] rusqlite::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// True when SQLite rejected a write because of a unique/primary key.
pub(crate) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
  matches!(
    err,
    rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
  )
}
