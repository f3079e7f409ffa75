//! User actions over the record store.
//!
//! Each action resolves to a typed result; `notification()` turns it into
//! the message the user sees.

use thiserror::Error;
use tracing::{info, warn};

use crate::db::{StoreError, UserRecord, UserStore};

use super::notify::Notification;
use super::types::{new_user_id, ContactFields, Field};
use super::validation::validate;

/// What the records panel should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
  Empty,
  Table(Vec<UserRecord>),
}

#[derive(Debug, Error)]
pub enum ActionError {
  #[error("invalid fields: {}", .0.iter().map(|f| f.label()).collect::<Vec<_>>().join(", "))]
  Invalid(Vec<Field>),

  #[error("no contact with id {0}")]
  NotFound(String),

  #[error(transparent)]
  Store(#[from] StoreError),
}

impl ActionError {
  pub fn notification(&self) -> Notification {
    match self {
      ActionError::Invalid(_) => {
        Notification::error("Every field needs at least 2 characters")
      }
      ActionError::NotFound(_) => Notification::error("Contact not found"),
      ActionError::Store(StoreError::DuplicateId(_)) => {
        Notification::error("A contact with this id already exists")
      }
      ActionError::Store(e) => Notification::error(format!("Storage error: {}", e)),
    }
  }
}

pub type ActionResult<T> = std::result::Result<T, ActionError>;

/// The contact manager core: validation, id assignment and store calls.
#[derive(Clone)]
pub struct ContactBook {
  store: UserStore,
}

impl ContactBook {
  pub fn new(store: UserStore) -> Self {
    Self { store }
  }

  /// Submit-create: validate, assign a fresh id, insert.
  pub async fn create(&self, fields: ContactFields) -> ActionResult<UserRecord> {
    validate(&fields).map_err(ActionError::Invalid)?;

    let record = fields.into_record(new_user_id());
    self.store.insert(record.clone()).await.map_err(|e| {
      warn!(error = %e, "insert failed");
      e
    })?;

    info!(id = %record.id, "contact added");
    Ok(record)
  }

  /// Submit-update: validate, then replace every field at `id`.
  pub async fn update(&self, id: &str, fields: ContactFields) -> ActionResult<UserRecord> {
    validate(&fields).map_err(ActionError::Invalid)?;

    let record = fields.into_record(id.to_string());
    self.store.replace(record.clone()).await.map_err(|e| {
      warn!(error = %e, id, "replace failed");
      e
    })?;

    info!(id, "contact updated");
    Ok(record)
  }

  pub async fn delete(&self, id: &str) -> ActionResult<()> {
    self.store.delete(id).await.map_err(|e| {
      warn!(error = %e, id, "delete failed");
      e
    })?;

    info!(id, "contact deleted");
    Ok(())
  }

  /// Begin-edit: load the record to prefill the form.
  pub async fn begin_edit(&self, id: &str) -> ActionResult<UserRecord> {
    self
      .store
      .get(id)
      .await?
      .ok_or_else(|| ActionError::NotFound(id.to_string()))
  }

  pub async fn get(&self, id: &str) -> ActionResult<Option<UserRecord>> {
    Ok(self.store.get(id).await?)
  }

  pub async fn count(&self) -> ActionResult<usize> {
    Ok(self.store.count().await?)
  }

  /// Count first; only list when there is something to show.
  pub async fn refresh(&self) -> ActionResult<Screen> {
    if self.store.count().await? == 0 {
      return Ok(Screen::Empty);
    }
    Ok(Screen::Table(self.store.list().await?))
  }
}
