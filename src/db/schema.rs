/// Name of the only collection.
pub const USERS: &str = "users";

/// Creates the users collection keyed by `id`. Safe to run repeatedly.
pub const CREATE_USERS: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY NOT NULL,
    firstname TEXT NOT NULL,
    lastname TEXT NOT NULL,
    email TEXT NOT NULL,
    phone TEXT NOT NULL
);
"#;
