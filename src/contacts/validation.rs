use super::types::{ContactFields, Field};

/// Minimum length of every field, in characters.
pub const MIN_FIELD_LEN: usize = 2;

/// Check every field. Returns the fields that fail, in display order.
pub fn validate(fields: &ContactFields) -> Result<(), Vec<Field>> {
  let invalid: Vec<Field> = Field::ALL
    .into_iter()
    .filter(|f| !is_valid(fields.get(*f)))
    .collect();

  if invalid.is_empty() {
    Ok(())
  } else {
    Err(invalid)
  }
}

pub fn is_valid(value: &str) -> bool {
  value.trim().chars().count() >= MIN_FIELD_LEN
}
