//! Account ledger: the single source of truth for spendable balances.

use std::sync::Arc;

use panel_db::queries::accounts;
use panel_db::DbError;
use panel_types::UserId;
use rusqlite::Connection;

use crate::clock::Clock;
use crate::store::Store;
use crate::{positive_amount, LedgerError, Result};

#[derive(Clone)]
pub struct AccountLedger {
    store: Store,
    clock: Arc<dyn Clock>,
}

impl AccountLedger {
    pub fn new(store: Store, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Register a balance for `user_id`. Existing accounts are left as is.
    ///
    /// Returns whether a new account was created.
    pub fn open_account(&self, user_id: UserId, initial_tokens: u64) -> Result<bool> {
        let now = self.clock.now_millis();
        let created = self
            .store
            .write(|tx| Ok(accounts::create(tx, user_id, initial_tokens, now)?))?;
        if created {
            tracing::info!(user_id, initial_tokens, "account opened");
        }
        Ok(created)
    }

    /// Current balance. Unknown users have a balance of 0.
    pub fn get_balance(&self, user_id: UserId) -> Result<u64> {
        self.store
            .read(|conn| Ok(accounts::balance(conn, user_id)?.unwrap_or(0)))
    }

    /// Add `amount` tokens. Returns `false` if the user has no account.
    pub fn credit(&self, user_id: UserId, amount: u64) -> Result<bool> {
        positive_amount(amount)?;
        self.store.write(|tx| credit_in(tx, user_id, amount))
    }

    /// Remove `amount` tokens if the balance covers it.
    ///
    /// Returns `false` and leaves the balance untouched on insufficient
    /// funds. The check and the decrement are one conditional update, so
    /// concurrent debits can never take the balance below zero.
    pub fn debit(&self, user_id: UserId, amount: u64) -> Result<bool> {
        positive_amount(amount)?;
        let debited = self
            .store
            .write(|tx| Ok(accounts::debit(tx, user_id, amount)?))?;
        if !debited {
            tracing::warn!(user_id, amount, "debit rejected: insufficient funds");
        }
        Ok(debited)
    }

    pub fn can_afford(&self, user_id: UserId, cost: u64) -> Result<bool> {
        Ok(self.get_balance(user_id)? >= cost)
    }
}

/// Credit on an open transaction, reporting overflow as
/// [`LedgerError::BalanceOverflow`].
pub(crate) fn credit_in(conn: &Connection, user_id: UserId, amount: u64) -> Result<bool> {
    match accounts::credit(conn, user_id, amount) {
        Ok(credited) => Ok(credited),
        Err(DbError::Constraint(_)) => {
            tracing::warn!(user_id, amount, "credit rejected: balance overflow");
            Err(LedgerError::BalanceOverflow { user_id, amount })
        }
        Err(e) => Err(e.into()),
    }
}

impl std::fmt::Debug for AccountLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountLedger").finish_non_exhaustive()
    }
}
