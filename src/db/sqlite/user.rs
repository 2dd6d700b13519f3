//! User management

use crate::db::sqlite::models::{NewUser, User};
use crate::error::{ApiError, Result};
use crate::security;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row};

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        country: row.get(4)?,
        district: row.get(5)?,
        created_at: row.get(6)?,
    })
}

const USER_COLUMNS: &str = "id, username, email, phone, country, district, created_at";

/// Create a new user
///
/// The password is hashed before it touches the database. A UNIQUE
/// constraint violation on username or email maps to `DuplicateIdentity`.
pub fn create_user(conn: &Connection, new_user: &NewUser<'_>) -> Result<User> {
    let password_hash = security::hash_password(new_user.password)?;

    let result = conn.execute(
        "INSERT INTO users (username, email, password_hash, phone, country, district)
         VALUES (?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            new_user.username,
            new_user.email,
            password_hash,
            new_user.phone,
            new_user.country,
            new_user.district,
        ],
    );

    match result {
        Ok(_) => {
            let id = conn.last_insert_rowid();
            find_by_id(conn, id)?
                .ok_or_else(|| ApiError::Internal("User vanished after insert".to_string()))
        }
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == ErrorCode::ConstraintViolation =>
        {
            Err(ApiError::DuplicateIdentity)
        }
        Err(e) => Err(e.into()),
    }
}

/// Look up a user by id
pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS),
            [id],
            user_from_row,
        )
        .optional()?;
    Ok(user)
}

/// Look up a user by email
pub fn find_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS),
            [email],
            user_from_row,
        )
        .optional()?;
    Ok(user)
}

/// Verify user credentials
///
/// Recomputes the Argon2 verification against the stored digest; plaintext
/// is never compared. Returns `None` for both unknown email and wrong
/// password so callers cannot distinguish the two.
pub fn verify_user(conn: &Connection, email: &str, password: &str) -> Result<Option<User>> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {}, password_hash FROM users WHERE email = ?",
                USER_COLUMNS
            ),
            [email],
            |row| {
                let user = user_from_row(row)?;
                let hash: String = row.get(7)?;
                Ok((user, hash))
            },
        )
        .optional()?;

    match row {
        Some((user, hash)) => {
            if security::verify_password(password, &hash)? {
                Ok(Some(user))
            } else {
                Ok(None)
            }
        }
        None => Ok(None),
    }
}
