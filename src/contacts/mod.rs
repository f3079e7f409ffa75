//! Contact manager core: field validation, id assignment, user actions and
//! the notifications they produce.

mod notify;
mod service;
mod types;
mod validation;

pub use notify::{Notification, Severity};
pub use service::{ActionError, ContactBook, Screen};
pub use types::{ContactFields, Field};
pub use validation::{validate, MIN_FIELD_LEN};
