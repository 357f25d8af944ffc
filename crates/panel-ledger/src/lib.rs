//! # panel-ledger
//!
//! Token-gated chapter access.
//!
//! Decides whether a user may read a chapter, moves tokens in and out of the
//! user's balance, records permanent unlocks, and keeps an audit trail of
//! every balance change.
//!
//! ## Modules
//!
//! - [`store`]: Shared SQLite handle and unit-of-work helper
//! - [`ledger`]: Per-user token balance
//! - [`entitlements`]: Purchased, bookmarked, liked and viewed chapters
//! - [`txlog`]: Append-only transaction history
//! - [`catalog`]: Chapter lock metadata lookup
//! - [`access`]: The orchestrator tying the above into one unlock workflow
//! - [`clock`]: Time source
//!
//! Components are built once and handed to [`access::AccessControl`]; they
//! must all share the same [`store::Store`] so an unlock commits or rolls
//! back as a single SQLite transaction.

pub mod access;
pub mod catalog;
pub mod clock;
pub mod entitlements;
pub mod ledger;
pub mod store;
pub mod txlog;

pub use access::AccessControl;
pub use catalog::{ChapterCatalog, ChapterLookup};
pub use clock::{Clock, FixedClock, SystemClock};
pub use entitlements::EntitlementStore;
pub use ledger::AccountLedger;
pub use store::Store;
pub use txlog::TransactionLog;

/// Error types for ledger operations.
///
/// Insufficient funds is not an error; see [`ledger::AccountLedger::debit`]
/// and [`panel_types::access::UnlockResult`].
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Persistence failure.
    #[error("database error: {0}")]
    Db(#[from] panel_db::DbError),

    /// Persistence failure raised by the driver directly.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Token amounts must be strictly positive.
    #[error("amount must be positive, got {0}")]
    InvalidAmount(u64),

    /// The credit would take the balance past what storage can hold.
    #[error("crediting {amount} tokens would overflow the balance of user {user_id}")]
    BalanceOverflow { user_id: panel_types::UserId, amount: u64 },

    /// A previous holder of the store lock panicked.
    #[error("store lock poisoned")]
    StorePoisoned,
}

/// Convenience result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Reject zero amounts and amounts SQLite cannot hold.
pub(crate) fn positive_amount(amount: u64) -> Result<i64> {
    if amount == 0 {
        return Err(LedgerError::InvalidAmount(amount));
    }
    i64::try_from(amount).map_err(|_| LedgerError::InvalidAmount(amount))
}
