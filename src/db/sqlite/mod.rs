//! SQLite database module

pub mod models;
mod migrations;
mod user;

use crate::error::Result;
use models::{NewUser, User};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;

/// SQLite database wrapper
///
/// A single connection behind a mutex: every query replaces or reads whole
/// rows, so serialized access is sufficient. Uniqueness of username/email is
/// enforced by UNIQUE constraints inside the insert itself.
pub struct SqliteDb {
    conn: Mutex<Connection>,
}

impl SqliteDb {
    /// Open (or create) the database at the given path
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent access
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.run_migrations()?;

        Ok(db)
    }

    /// In-memory database for tests
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn.lock();
        migrations::run_migrations(&conn)
    }

    /// Create a new user, hashing the password before persistence
    pub fn create_user(&self, new_user: &NewUser<'_>) -> Result<User> {
        let conn = self.conn.lock();
        user::create_user(&conn, new_user)
    }

    /// Look up a user by email
    pub fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn.lock();
        user::find_by_email(&conn, email)
    }

    /// Verify credentials, returning the user on success
    pub fn verify_user(&self, email: &str, password: &str) -> Result<Option<User>> {
        let conn = self.conn.lock();
        user::verify_user(&conn, email, password)
    }
}
