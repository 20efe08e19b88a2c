// Database trait — async interface for all DB operations.
//
// The only implementor today is SqliteDatabase (wraps rusqlite behind a
// mutex). Methods are async so a native async backend could slot in later
// without touching callers.

use anyhow::Result;
use async_trait::async_trait;

use super::models::{NewUser, UserRecord};

#[async_trait]
pub trait Database: Send + Sync {
    // --- Lifecycle ---

    /// Count the number of user-created tables in the database.
    async fn table_count(&self) -> Result<i64>;

    // --- Users ---

    /// Insert a new user and return its id. Fails on a duplicate username.
    async fn insert_user(&self, user: &NewUser) -> Result<i64>;

    /// All users in id order.
    async fn list_users(&self) -> Result<Vec<UserRecord>>;

    async fn get_user(&self, id: i64) -> Result<Option<UserRecord>>;

    async fn get_user_by_username(&self, username: &str) -> Result<Option<UserRecord>>;

    /// Returns false when the id doesn't exist.
    async fn update_user(&self, id: i64, username: &str, email: &str) -> Result<bool>;

    /// Returns false when the id doesn't exist.
    async fn delete_user(&self, id: i64) -> Result<bool>;

    /// Flip the superuser flag; returns the new value, or None for an unknown id.
    async fn toggle_superuser(&self, id: i64) -> Result<Option<bool>>;

    /// (total users, superusers)
    async fn user_counts(&self) -> Result<(i64, i64)>;
}
