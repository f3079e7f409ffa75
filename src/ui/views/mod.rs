mod contacts;

pub use contacts::{draw_contact_table, draw_message};
