//! Account balance query functions.

use rusqlite::{Connection, OptionalExtension};

use panel_types::UserId;

use super::sql_int;
use crate::{DbError, Result};

/// Create an account with an opening balance.
///
/// Returns `false` if the account already exists; its balance is untouched.
pub fn create(conn: &Connection, user_id: UserId, tokens: u64, created_at: u64) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO accounts (user_id, tokens, created_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![user_id, sql_int(tokens)?, sql_int(created_at)?],
    )?;
    Ok(inserted > 0)
}

/// Current balance, or `None` for an unknown user.
pub fn balance(conn: &Connection, user_id: UserId) -> Result<Option<u64>> {
    let tokens: Option<i64> = conn
        .query_row(
            "SELECT tokens FROM accounts WHERE user_id = ?1",
            [user_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(tokens.map(|t| t.max(0) as u64))
}

/// Add tokens. Returns `false` for an unknown user.
///
/// A credit that would push the balance past `i64::MAX` is a
/// [`DbError::Constraint`] and leaves the balance untouched. Without the
/// guard SQLite would silently store the sum as REAL.
pub fn credit(conn: &Connection, user_id: UserId, amount: u64) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE accounts SET tokens = tokens + ?1
         WHERE user_id = ?2 AND tokens <= 9223372036854775807 - ?1",
        rusqlite::params![sql_int(amount)?, user_id],
    )?;
    if updated > 0 {
        return Ok(true);
    }
    match balance(conn, user_id)? {
        Some(current) => Err(DbError::Constraint(format!(
            "crediting {amount} would overflow balance {current} of user {user_id}"
        ))),
        None => Ok(false),
    }
}

/// Remove tokens if and only if the balance covers `amount`.
///
/// Check and decrement are one statement, so concurrent debits against the
/// same row cannot both pass the check. Returns `false` (balance untouched)
/// on insufficient funds or an unknown user.
pub fn debit(conn: &Connection, user_id: UserId, amount: u64) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE accounts SET tokens = tokens - ?1 WHERE user_id = ?2 AND tokens >= ?1",
        rusqlite::params![sql_int(amount)?, user_id],
    )?;
    Ok(updated > 0)
}
