// SqliteDatabase — rusqlite backend implementing the Database trait.
//
// The Connection is wrapped in tokio::sync::Mutex because Connection is !Sync.
// Trait methods lock the mutex, do synchronous rusqlite work, and return.
// Every request therefore sees a serialized view of the users table.

use anyhow::Result;
use async_trait::async_trait;
use rusqlite::Connection;
use tokio::sync::Mutex;

use super::models::{NewUser, UserRecord};
use super::traits::Database;

pub struct SqliteDatabase {
    conn: Mutex<Connection>,
}

impl SqliteDatabase {
    /// Wrap an already-opened rusqlite Connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Fresh in-memory database with the schema applied.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        super::schema::create_tables(&conn)?;
        Ok(Self::new(conn))
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn table_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::schema::table_count(&conn)
    }

    async fn insert_user(&self, user: &NewUser) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::queries::insert_user(&conn, user)
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>> {
        let conn = self.conn.lock().await;
        super::queries::list_users(&conn)
    }

    async fn get_user(&self, id: i64) -> Result<Option<UserRecord>> {
        let conn = self.conn.lock().await;
        super::queries::get_user(&conn, id)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        let conn = self.conn.lock().await;
        super::queries::get_user_by_username(&conn, username)
    }

    async fn update_user(&self, id: i64, username: &str, email: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        super::queries::update_user(&conn, id, username, email)
    }

    async fn delete_user(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().await;
        super::queries::delete_user(&conn, id)
    }

    async fn toggle_superuser(&self, id: i64) -> Result<Option<bool>> {
        let conn = self.conn.lock().await;
        super::queries::toggle_superuser(&conn, id)
    }

    async fn user_counts(&self) -> Result<(i64, i64)> {
        let conn = self.conn.lock().await;
        super::queries::user_counts(&conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(name: &str) -> NewUser {
        NewUser {
            username: name.to_string(),
            email: format!("{name}@example.com"),
            is_superuser: false,
            password_hash: "hash".to_string(),
        }
    }

    #[tokio::test]
    async fn test_trait_user_roundtrip() {
        let db = SqliteDatabase::in_memory().unwrap();
        let id = db.insert_user(&new_user("ada")).await.unwrap();
        let found = db.get_user_by_username("ada").await.unwrap().unwrap();
        assert_eq!(found.id, id);
        assert_eq!(db.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_trait_duplicate_username_fails() {
        let db = SqliteDatabase::in_memory().unwrap();
        db.insert_user(&new_user("ada")).await.unwrap();
        assert!(db.insert_user(&new_user("ada")).await.is_err());
    }

    #[tokio::test]
    async fn test_trait_table_count() {
        let db = SqliteDatabase::in_memory().unwrap();
        assert_eq!(db.table_count().await.unwrap(), 2);
    }
}
