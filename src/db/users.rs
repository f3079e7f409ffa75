//! CRUD over the users collection.

use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::{is_constraint_violation, StoreError, StoreResult};
use super::Database;

/// A stored contact. `id` is immutable once assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
  pub id: String,
  pub firstname: String,
  pub lastname: String,
  pub email: String,
  pub phone: String,
}

impl UserRecord {
  pub fn new(
    id: impl Into<String>,
    firstname: impl Into<String>,
    lastname: impl Into<String>,
    email: impl Into<String>,
    phone: impl Into<String>,
  ) -> Self {
    Self {
      id: id.into(),
      firstname: firstname.into(),
      lastname: lastname.into(),
      email: email.into(),
      phone: phone.into(),
    }
  }

  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id: row.get(0)?,
      firstname: row.get(1)?,
      lastname: row.get(2)?,
      email: row.get(3)?,
      phone: row.get(4)?,
    })
  }
}

const SELECT_COLUMNS: &str = "SELECT id, firstname, lastname, email, phone FROM users";

impl Database {
  /// Add a new record. Fails with `DuplicateId` if the id is taken.
  pub fn insert_user(&self, record: &UserRecord) -> StoreResult<()> {
    let conn = self.lock()?;
    conn
      .execute(
        "INSERT INTO users (id, firstname, lastname, email, phone) VALUES (?, ?, ?, ?, ?)",
        params![
          record.id,
          record.firstname,
          record.lastname,
          record.email,
          record.phone
        ],
      )
      .map_err(|e| {
        if is_constraint_violation(&e) {
          StoreError::DuplicateId(record.id.clone())
        } else {
          StoreError::Sqlite(e)
        }
      })?;

    debug!(id = %record.id, "user inserted");
    Ok(())
  }

  /// Upsert all four fields at `record.id`. Keeps the row's position in
  /// `list_users` when it already exists.
  pub fn replace_user(&self, record: &UserRecord) -> StoreResult<()> {
    let conn = self.lock()?;
    conn.execute(
      "INSERT INTO users (id, firstname, lastname, email, phone) VALUES (?, ?, ?, ?, ?)
       ON CONFLICT(id) DO UPDATE SET
         firstname = excluded.firstname,
         lastname = excluded.lastname,
         email = excluded.email,
         phone = excluded.phone",
      params![
        record.id,
        record.firstname,
        record.lastname,
        record.email,
        record.phone
      ],
    )?;

    debug!(id = %record.id, "user replaced");
    Ok(())
  }

  /// Remove the record at `id`. Absent ids are not an error.
  pub fn delete_user(&self, id: &str) -> StoreResult<()> {
    let conn = self.lock()?;
    let removed = conn.execute("DELETE FROM users WHERE id = ?", params![id])?;
    debug!(id, removed, "user deleted");
    Ok(())
  }

  pub fn get_user(&self, id: &str) -> StoreResult<Option<UserRecord>> {
    let conn = self.lock()?;
    let mut stmt = conn.prepare(&format!("{} WHERE id = ?", SELECT_COLUMNS))?;
    let record = stmt
      .query_row(params![id], UserRecord::from_row)
      .optional()?;
    Ok(record)
  }

  pub fn list_users(&self) -> StoreResult<Vec<UserRecord>> {
    let conn = self.lock()?;
    let mut stmt = conn.prepare(&format!("{} ORDER BY rowid", SELECT_COLUMNS))?;
    let records = stmt
      .query_map([], UserRecord::from_row)?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(records)
  }

  pub fn count_users(&self) -> StoreResult<usize> {
    let conn = self.lock()?;
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
    Ok(usize::try_from(count).unwrap_or_default())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn db() -> Database {
    Database::open_in_memory(1).unwrap()
  }

  fn record(id: &str) -> UserRecord {
    UserRecord::new(id, "Grace", "Hopper", "grace@example.com", "555-0100")
  }

  #[test]
  fn test_insert_then_get() {
    let db = db();
    let r = record("u1");
    db.insert_user(&r).unwrap();
    assert_eq!(db.get_user("u1").unwrap(), Some(r));
  }

  #[test]
  fn test_get_missing_is_none() {
    assert_eq!(db().get_user("nope").unwrap(), None);
  }

  #[test]
  fn test_duplicate_insert_fails_distinctly() {
    let db = db();
    db.insert_user(&record("same")).unwrap();

    let mut second = record("same");
    second.firstname = "Other".to_string();
    let err = db.insert_user(&second).unwrap_err();
    assert!(matches!(err, StoreError::DuplicateId(ref id) if id == "same"));

    // First write is untouched
    assert_eq!(db.get_user("same").unwrap().unwrap().firstname, "Grace");
  }

  #[test]
  fn test_replace_existing() {
    let db = db();
    db.insert_user(&record("u1")).unwrap();

    let mut updated = record("u1");
    updated.email = "hopper@navy.mil".to_string();
    db.replace_user(&updated).unwrap();

    assert_eq!(db.get_user("u1").unwrap(), Some(updated));
    assert_eq!(db.count_users().unwrap(), 1);
  }

  #[test]
  fn test_replace_missing_inserts() {
    let db = db();
    let r = record("fresh");
    db.replace_user(&r).unwrap();
    assert_eq!(db.get_user("fresh").unwrap(), Some(r));
  }

  #[test]
  fn test_replace_keeps_list_position() {
    let db = db();
    db.insert_user(&record("a")).unwrap();
    db.insert_user(&record("b")).unwrap();
    db.insert_user(&record("c")).unwrap();

    let mut updated = record("a");
    updated.lastname = "Changed".to_string();
    db.replace_user(&updated).unwrap();

    let ids: Vec<String> = db.list_users().unwrap().into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
  }

  #[test]
  fn test_delete_is_idempotent() {
    let db = db();
    db.insert_user(&record("u1")).unwrap();

    db.delete_user("u1").unwrap();
    assert_eq!(db.get_user("u1").unwrap(), None);

    db.delete_user("u1").unwrap();
    db.delete_user("never-existed").unwrap();
    assert_eq!(db.get_user("never-existed").unwrap(), None);
  }

  #[test]
  fn test_count_after_inserts_and_deletes() {
    let db = db();
    for i in 0..5 {
      db.insert_user(&record(&format!("u{}", i))).unwrap();
    }
    db.delete_user("u1").unwrap();
    db.delete_user("u3").unwrap();
    assert_eq!(db.count_users().unwrap(), 3);
  }

  #[test]
  fn test_list_empty() {
    let db = db();
    assert!(db.list_users().unwrap().is_empty());
    assert_eq!(db.count_users().unwrap(), 0);
  }
}
