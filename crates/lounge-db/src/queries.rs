use crate::Database;
use crate::error::StoreError;
use crate::models::{AccountRow, MessageRow, PostRow};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};

impl Database {
    // -- Accounts --

    /// Insert an account and return its id. A taken username is `StoreError::Duplicate`.
    pub fn create_account(&self, username: &str, password_hash: &str) -> Result<i64, StoreError> {
        self.with_conn(|conn| {
            Ok(conn
                .execute(
                    "INSERT INTO accounts (username, password) VALUES (?1, ?2)",
                    (username, password_hash),
                )
                .map(|_| conn.last_insert_rowid()))
        })?
        .map_err(StoreError::from)
    }

    pub fn get_account_by_username(&self, username: &str) -> Result<Option<AccountRow>> {
        self.with_conn(|conn| query_account(conn, "username", &username))
    }

    pub fn get_account_by_id(&self, id: i64) -> Result<Option<AccountRow>> {
        self.with_conn(|conn| query_account(conn, "id", &id))
    }

    /// Rename an account. Returns `false` when no account has that id.
    pub fn rename_account(&self, id: i64, username: &str) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE accounts SET username = ?1 WHERE id = ?2",
                rusqlite::params![username, id],
            ))
        })?
        .map(|changed| changed > 0)
        .map_err(StoreError::from)
    }

    // -- Messages --

    pub fn insert_message(&self, user_id: i64, body: &str, created_at: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (user_id, body, created_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![user_id, body, created_at],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Newest first.
    pub fn get_recent_messages(&self, limit: u32) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            // JOIN accounts so the current username comes back with each row
            let mut stmt = conn.prepare(
                "SELECT m.id, m.user_id, a.username, m.body, m.created_at
                 FROM messages m
                 JOIN accounts a ON m.user_id = a.id
                 ORDER BY m.id DESC
                 LIMIT ?1",
            )?;

            let rows = stmt
                .query_map([limit], |row| {
                    Ok(MessageRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        username: row.get(2)?,
                        body: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Delete every message created strictly before `cutoff`. Returns the row count.
    pub fn delete_messages_before(&self, cutoff: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM messages WHERE created_at < ?1", [cutoff])?;
            Ok(deleted)
        })
    }

    pub fn vacuum(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute_batch("VACUUM")?;
            Ok(())
        })
    }

    // -- Posts --

    pub fn insert_post(&self, author: &str, title: &str, content: &str, created_at: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO posts (author, title, content, created_at) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![author, title, content, created_at],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Newest first.
    pub fn get_recent_posts(&self, limit: u32) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, author, title, content, created_at
                 FROM posts
                 ORDER BY id DESC
                 LIMIT ?1",
            )?;

            let rows = stmt
                .query_map([limit], |row| {
                    Ok(PostRow {
                        id: row.get(0)?,
                        author: row.get(1)?,
                        title: row.get(2)?,
                        content: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

fn query_account(
    conn: &Connection,
    column: &str,
    value: &dyn rusqlite::types::ToSql,
) -> Result<Option<AccountRow>> {
    let sql = format!("SELECT id, username, password, created_at FROM accounts WHERE {column} = ?1");
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(AccountRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                created_at: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_username_is_reported_distinctly() {
        let db = Database::open_in_memory().unwrap();
        db.create_account("alice", "hash").unwrap();

        let err = db.create_account("alice", "other").unwrap_err();
        assert!(matches!(err, StoreError::Duplicate));
    }

    #[test]
    fn rename_collision_and_missing_account() {
        let db = Database::open_in_memory().unwrap();
        let alice = db.create_account("alice", "h").unwrap();
        db.create_account("bob", "h").unwrap();

        assert!(matches!(db.rename_account(alice, "bob"), Err(StoreError::Duplicate)));
        assert!(db.rename_account(alice, "carol").unwrap());
        assert!(!db.rename_account(9999, "dave").unwrap());

        let row = db.get_account_by_id(alice).unwrap().unwrap();
        assert_eq!(row.username, "carol");
        assert!(db.get_account_by_username("alice").unwrap().is_none());
    }

    #[test]
    fn message_for_unknown_account_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.insert_message(42, "orphan", "2024-01-01 00:00:00").is_err());
    }
}
