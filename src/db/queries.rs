// Database queries — CRUD operations for the users table.
//
// Every database interaction goes through this module. This keeps SQL
// contained in one place and gives the rest of the app clean Rust interfaces.

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::models::{NewUser, UserRecord};

const USER_COLUMNS: &str = "id, username, email, is_superuser, password_hash, created_at";

/// Insert a new user and return its id.
pub fn insert_user(conn: &Connection, user: &NewUser) -> Result<i64> {
    conn.execute(
        "INSERT INTO users (username, email, is_superuser, password_hash, created_at)
         VALUES (?1, ?2, ?3, ?4, datetime('now'))",
        params![
            user.username,
            user.email,
            user.is_superuser,
            user.password_hash
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// All users in id order.
pub fn list_users(conn: &Connection) -> Result<Vec<UserRecord>> {
    let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))?;
    let rows = stmt
        .query_map([], row_to_user)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn get_user(conn: &Connection, id: i64) -> Result<Option<UserRecord>> {
    let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))?;
    let result = stmt.query_row(params![id], row_to_user).optional()?;
    Ok(result)
}

/// Exact, case-sensitive username lookup (the login path).
pub fn get_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE username = ?1"
    ))?;
    let result = stmt.query_row(params![username], row_to_user).optional()?;
    Ok(result)
}

/// Update username and stored email. Returns false when no row has this id.
pub fn update_user(conn: &Connection, id: i64, username: &str, email: &str) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE users SET username = ?2, email = ?3 WHERE id = ?1",
        params![id, username, email],
    )?;
    Ok(changed > 0)
}

/// Returns false when no row has this id.
pub fn delete_user(conn: &Connection, id: i64) -> Result<bool> {
    let changed = conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
    Ok(changed > 0)
}

/// Flip the superuser flag in place. Returns the new value, or None if the
/// id doesn't exist.
pub fn toggle_superuser(conn: &Connection, id: i64) -> Result<Option<bool>> {
    let changed = conn.execute(
        "UPDATE users SET is_superuser = NOT is_superuser WHERE id = ?1",
        params![id],
    )?;
    if changed == 0 {
        return Ok(None);
    }
    let flag: bool = conn.query_row(
        "SELECT is_superuser FROM users WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    Ok(Some(flag))
}

/// Returns (total users, superusers).
pub fn user_counts(conn: &Connection) -> Result<(i64, i64)> {
    let counts = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(is_superuser), 0) FROM users",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok(counts)
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<UserRecord> {
    Ok(UserRecord {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        is_superuser: row.get(3)?,
        password_hash: row.get(4)?,
        created_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::create_tables;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        conn
    }

    fn new_user(name: &str) -> NewUser {
        NewUser {
            username: name.to_string(),
            email: format!("{name}@example.com"),
            is_superuser: false,
            password_hash: "$2b$04$fakehash".to_string(),
        }
    }

    #[test]
    fn test_insert_and_get() {
        let conn = test_conn();
        let id = insert_user(&conn, &new_user("ada")).unwrap();
        let user = get_user(&conn, id).unwrap().unwrap();
        assert_eq!(user.username, "ada");
        assert_eq!(user.email, "ada@example.com");
        assert!(!user.is_superuser);
        assert!(!user.created_at.is_empty());
    }

    #[test]
    fn test_get_missing_is_none() {
        let conn = test_conn();
        assert!(get_user(&conn, 42).unwrap().is_none());
        assert!(get_user_by_username(&conn, "nobody").unwrap().is_none());
    }

    #[test]
    fn test_list_in_id_order() {
        let conn = test_conn();
        insert_user(&conn, &new_user("b")).unwrap();
        insert_user(&conn, &new_user("a")).unwrap();
        let names: Vec<String> = list_users(&conn)
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn test_update_and_delete_report_missing_rows() {
        let conn = test_conn();
        let id = insert_user(&conn, &new_user("ada")).unwrap();
        assert!(update_user(&conn, id, "ada2", "new@example.com").unwrap());
        assert!(!update_user(&conn, id + 1, "x", "y").unwrap());
        assert_eq!(get_user(&conn, id).unwrap().unwrap().username, "ada2");

        assert!(delete_user(&conn, id).unwrap());
        assert!(!delete_user(&conn, id).unwrap());
    }

    #[test]
    fn test_toggle_superuser_flips_and_reports_missing() {
        let conn = test_conn();
        let id = insert_user(&conn, &new_user("ada")).unwrap();
        assert_eq!(toggle_superuser(&conn, id).unwrap(), Some(true));
        assert_eq!(toggle_superuser(&conn, id).unwrap(), Some(false));
        assert_eq!(toggle_superuser(&conn, 999).unwrap(), None);
    }

    #[test]
    fn test_user_counts() {
        let conn = test_conn();
        assert_eq!(user_counts(&conn).unwrap(), (0, 0));
        let mut admin = new_user("root");
        admin.is_superuser = true;
        insert_user(&conn, &admin).unwrap();
        insert_user(&conn, &new_user("ada")).unwrap();
        assert_eq!(user_counts(&conn).unwrap(), (2, 1));
    }
}
