// Data models — Rust structs that map to database rows.
//
// Kept apart from the queries so other modules can use them without
// depending on rusqlite directly.

use serde::{Deserialize, Serialize};

/// A stored account row. Deliberately not `Serialize`: the password hash
/// must never reach a response body. Use `UserView` for that.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    /// As stored: ciphertext when email encryption is enabled.
    pub email: String,
    pub is_superuser: bool,
    pub password_hash: String,
    pub created_at: String,
}

/// Values for a new row. `email` is already in its stored form.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub is_superuser: bool,
    pub password_hash: String,
}

/// Public view of an account, with the email in plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserView {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub is_superuser: bool,
    /// `datetime('now')` at insert; empty for rows older than the column.
    pub created_at: String,
}
