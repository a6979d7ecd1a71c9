//! CRUD operations for [`User`] records, including the reserved platform
//! owner account that collects fees.

use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

use chunkfund_shared::constants::PLATFORM_OWNER_USERNAME;
use chunkfund_shared::types::UserId;

use crate::database::{now_rfc3339, parse_timestamp, Database};
use crate::error::{Result, StoreError};
use crate::models::User;

const USER_COLUMNS: &str = "user_id, username, created_at";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Register a new user.  Usernames are trimmed and must be unique.
    pub fn create_user(&self, username: &str) -> Result<User> {
        let username = username.trim();
        if username.is_empty() {
            return Err(StoreError::InvalidInput("username must not be empty".into()));
        }

        let id = insert_user(self.conn(), username)?;
        tracing::info!(user_id = %id, username, "user created");
        self.get_user(id)
    }

    /// Return the platform owner's id, creating the account if missing.
    pub fn ensure_platform_owner(&self) -> Result<UserId> {
        platform_owner_id(self.conn())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_user(&self, id: UserId) -> Result<User> {
        find_user(self.conn(), id)?.ok_or(StoreError::UserNotFound(id))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        find_user_by_username(self.conn(), username)
    }

    /// List all users, newest first.
    pub fn list_users(&self) -> Result<Vec<User>> {
        let mut stmt = self
            .conn()
            .prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY user_id DESC"))?;

        let rows = stmt.query_map([], row_to_user)?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn insert_user(conn: &Connection, username: &str) -> Result<UserId> {
    let result = conn.execute(
        "INSERT INTO users (username, created_at) VALUES (?1, ?2)",
        params![username, now_rfc3339()],
    );

    match result {
        Ok(_) => Ok(UserId(conn.last_insert_rowid())),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == ErrorCode::ConstraintViolation =>
        {
            Err(StoreError::UsernameTaken(username.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Platform owner lookup-or-create, run on whatever connection or SQL
/// transaction the caller holds.
pub(crate) fn platform_owner_id(conn: &Connection) -> Result<UserId> {
    if let Some(user) = find_user_by_username(conn, PLATFORM_OWNER_USERNAME)? {
        return Ok(user.id);
    }

    let id = insert_user(conn, PLATFORM_OWNER_USERNAME)?;
    tracing::info!(user_id = %id, "created platform owner");
    Ok(id)
}

fn find_user_by_username(conn: &Connection, username: &str) -> Result<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
            params![username],
            row_to_user,
        )
        .optional()?;
    Ok(user)
}

pub(crate) fn find_user(conn: &Connection, id: UserId) -> Result<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
            params![id.0],
            row_to_user,
        )
        .optional()?;
    Ok(user)
}

/// Map a `rusqlite::Row` to a [`User`].
fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let created_str: String = row.get(2)?;
    Ok(User {
        id: UserId(row.get(0)?),
        username: row.get(1)?,
        created_at: parse_timestamp(2, &created_str)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_fetch() {
        let db = Database::open_in_memory().unwrap();
        let alice = db.create_user("  alice ").unwrap();
        assert_eq!(alice.username, "alice");
        assert_eq!(db.get_user(alice.id).unwrap(), alice);
    }

    #[test]
    fn duplicate_username_is_reported() {
        let db = Database::open_in_memory().unwrap();
        db.create_user("bob").unwrap();
        match db.create_user("bob") {
            Err(StoreError::UsernameTaken(name)) => assert_eq!(name, "bob"),
            other => panic!("expected UsernameTaken, got {other:?}"),
        }
    }

    #[test]
    fn empty_username_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(db.create_user("   "), Err(StoreError::InvalidInput(_))));
    }

    #[test]
    fn missing_user() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(
            db.get_user(UserId(99)),
            Err(StoreError::UserNotFound(UserId(99)))
        ));
        assert!(db.get_user_by_username("nobody").unwrap().is_none());
    }

    #[test]
    fn list_is_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let a = db.create_user("a").unwrap();
        let b = db.create_user("b").unwrap();
        let ids: Vec<_> = db.list_users().unwrap().into_iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }

    #[test]
    fn platform_owner_is_created_once() {
        let db = Database::open_in_memory().unwrap();
        let first = db.ensure_platform_owner().unwrap();
        let second = db.ensure_platform_owner().unwrap();
        assert_eq!(first, second);
        assert_eq!(db.get_user(first).unwrap().username, PLATFORM_OWNER_USERNAME);
    }
}
