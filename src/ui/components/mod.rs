mod form;
mod input;
mod key_result;

pub use form::{ContactForm, FormEvent, Pending};
pub use key_result::KeyResult;
