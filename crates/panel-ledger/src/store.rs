//! Shared database handle.
//!
//! One SQLite connection behind a mutex. Every write runs inside a
//! `BEGIN IMMEDIATE` transaction that commits only if the closure returns
//! `Ok`; an `Err` drops the transaction, which rolls it back.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::{LedgerError, Result};

#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open (and migrate) the database file at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::from_connection(panel_db::open(path)?))
    }

    /// Open a migrated in-memory database.
    pub fn open_memory() -> Result<Self> {
        Ok(Self::from_connection(panel_db::open_memory()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Run read-only queries.
    pub fn read<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Run `f` as one atomic unit of work.
    pub fn write<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| LedgerError::StorePoisoned)
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use panel_db::queries::accounts;

    #[test]
    fn test_write_commits_on_ok() {
        let store = Store::open_memory().expect("open");
        store
            .write(|tx| Ok(accounts::create(tx, 1, 50, 0)?))
            .expect("write");
        let balance = store.read(|conn| Ok(accounts::balance(conn, 1)?)).expect("read");
        assert_eq!(balance, Some(50));
    }

    #[test]
    fn test_write_rolls_back_on_err() {
        let store = Store::open_memory().expect("open");
        store
            .write(|tx| Ok(accounts::create(tx, 1, 50, 0)?))
            .expect("seed");

        let result: Result<()> = store.write(|tx| {
            accounts::debit(tx, 1, 20)?;
            Err(LedgerError::InvalidAmount(0))
        });
        assert!(result.is_err());

        let balance = store.read(|conn| Ok(accounts::balance(conn, 1)?)).expect("read");
        assert_eq!(balance, Some(50));
    }

    #[test]
    fn test_clones_share_connection() {
        let store = Store::open_memory().expect("open");
        let other = store.clone();
        store
            .write(|tx| Ok(accounts::create(tx, 7, 3, 0)?))
            .expect("write");
        let balance = other.read(|conn| Ok(accounts::balance(conn, 7)?)).expect("read");
        assert_eq!(balance, Some(3));
    }
}
