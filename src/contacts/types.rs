use uuid::Uuid;

use crate::db::UserRecord;

/// The four editable fields of a contact, as typed into the form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactFields {
  pub firstname: String,
  pub lastname: String,
  pub email: String,
  pub phone: String,
}

impl ContactFields {
  pub fn new(
    firstname: impl Into<String>,
    lastname: impl Into<String>,
    email: impl Into<String>,
    phone: impl Into<String>,
  ) -> Self {
    Self {
      firstname: firstname.into(),
      lastname: lastname.into(),
      email: email.into(),
      phone: phone.into(),
    }
  }

  pub fn get(&self, field: Field) -> &str {
    match field {
      Field::FirstName => &self.firstname,
      Field::LastName => &self.lastname,
      Field::Email => &self.email,
      Field::Phone => &self.phone,
    }
  }

  /// Stored values are trimmed.
  pub fn into_record(self, id: String) -> UserRecord {
    UserRecord {
      id,
      firstname: self.firstname.trim().to_string(),
      lastname: self.lastname.trim().to_string(),
      email: self.email.trim().to_string(),
      phone: self.phone.trim().to_string(),
    }
  }
}

impl From<&UserRecord> for ContactFields {
  fn from(record: &UserRecord) -> Self {
    Self {
      firstname: record.firstname.clone(),
      lastname: record.lastname.clone(),
      email: record.email.clone(),
      phone: record.phone.clone(),
    }
  }
}

/// Form field identifiers, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
  FirstName,
  LastName,
  Email,
  Phone,
}

impl Field {
  pub const ALL: [Field; 4] = [Field::FirstName, Field::LastName, Field::Email, Field::Phone];

  pub fn label(self) -> &'static str {
    match self {
      Field::FirstName => "First name",
      Field::LastName => "Last name",
      Field::Email => "Email",
      Field::Phone => "Phone",
    }
  }

  pub fn index(self) -> usize {
    match self {
      Field::FirstName => 0,
      Field::LastName => 1,
      Field::Email => 2,
      Field::Phone => 3,
    }
  }

  pub fn next(self) -> Self {
    Self::ALL[(self.index() + 1) % Self::ALL.len()]
  }

  pub fn previous(self) -> Self {
    Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
  }
}

/// Fresh record id. Random, so rapid successive creates never collide.
pub fn new_user_id() -> String {
  Uuid::new_v4().to_string()
}
