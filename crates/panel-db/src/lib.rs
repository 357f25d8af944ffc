//! # panel-db
//!
//! SQLite access layer for the Panel token economy.
//! Manages the single database file at `$PANEL_DATA_DIR/panel.db`.
//!
//! ## Schema
//!
//! - WAL mode, foreign keys enforced
//! - All timestamps are Unix epoch milliseconds
//! - Schema version stored in `PRAGMA user_version`
//!
//! Query functions take `&Connection`, so they run unchanged inside a
//! `rusqlite::Transaction` (which derefs to `Connection`).

pub mod migrations;
pub mod queries;
pub mod schema;

use rusqlite::Connection;
use std::path::Path;

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Database error types.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Open or create the database at the given path.
///
/// Configures WAL mode, foreign keys, and runs any pending migrations.
pub fn open(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing).
pub fn open_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )?;
    Ok(())
}
