//! Access control: the token gate in front of every chapter.
//!
//! ## Unlock workflow
//!
//! 1. Re-derive lock state from the chapter descriptor and the clock.
//! 2. Free chapters and already-owned chapters succeed without charge.
//! 3. Otherwise, inside one SQLite transaction: debit the cost, append a
//!    spend record, add the chapter to the purchased set. Any failure rolls
//!    back all three, so a user is never charged without the entitlement.
//!
//! The stored entitlement is re-read inside that transaction. A stale or
//! missing caller-supplied record can therefore never cause a second charge.

use std::sync::Arc;

use panel_db::queries::{accounts, entitlements as entitlement_rows, transactions};
use panel_types::access::{AccessResult, AccessState, UnlockResult};
use panel_types::chapter::ChapterLock;
use panel_types::entitlement::EntitlementRecord;
use panel_types::package::TokenPackage;
use panel_types::transaction::TransactionKind;
use panel_types::{ChapterId, UserId};

use crate::catalog::{ChapterCatalog, ChapterLookup};
use crate::clock::Clock;
use crate::entitlements::{mark_purchased_in, EntitlementStore};
use crate::ledger::{credit_in, AccountLedger};
use crate::store::Store;
use crate::txlog::{credit_entry, purchase_entry, spend_entry, TransactionLog};
use crate::Result;

/// What happened inside the unlock transaction.
enum UnlockOutcome {
    Unlocked { balance: u64 },
    AlreadyOwned { balance: u64 },
    Insufficient { balance: u64 },
}

pub struct AccessControl {
    store: Store,
    ledger: AccountLedger,
    entitlements: EntitlementStore,
    log: TransactionLog,
    chapters: Arc<dyn ChapterLookup>,
    clock: Arc<dyn Clock>,
}

impl AccessControl {
    /// Wire the orchestrator from already-built components.
    ///
    /// The ledger's store is used for the atomic unlock; the entitlement
    /// store and transaction log must have been built on the same store.
    pub fn new(
        ledger: AccountLedger,
        entitlements: EntitlementStore,
        log: TransactionLog,
        chapters: Arc<dyn ChapterLookup>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store: ledger.store().clone(),
            ledger,
            entitlements,
            log,
            chapters,
            clock,
        }
    }

    /// Build every component over one store, with the `chapters` table as
    /// the chapter lookup.
    pub fn with_store(store: Store, clock: Arc<dyn Clock>) -> Self {
        Self::new(
            AccountLedger::new(store.clone(), clock.clone()),
            EntitlementStore::new(store.clone(), clock.clone()),
            TransactionLog::new(store.clone(), clock.clone()),
            Arc::new(ChapterCatalog::new(store)),
            clock,
        )
    }

    pub fn ledger(&self) -> &AccountLedger {
        &self.ledger
    }

    pub fn entitlements(&self) -> &EntitlementStore {
        &self.entitlements
    }

    pub fn log(&self) -> &TransactionLog {
        &self.log
    }

    pub fn get_balance(&self, user_id: UserId) -> Result<u64> {
        self.ledger.get_balance(user_id)
    }

    /// Decide whether `user_id` may read `chapter` right now.
    ///
    /// `entitlement` may be the caller's cached record; the stored record is
    /// consulted as well, so passing `None` means "look it up".
    pub fn evaluate_access(
        &self,
        user_id: UserId,
        chapter: &ChapterLock,
        entitlement: Option<&EntitlementRecord>,
    ) -> Result<AccessResult> {
        self.evaluate_access_at(user_id, chapter, entitlement, self.clock.now_millis())
    }

    pub fn evaluate_access_at(
        &self,
        user_id: UserId,
        chapter: &ChapterLock,
        entitlement: Option<&EntitlementRecord>,
        now: u64,
    ) -> Result<AccessResult> {
        if !chapter.is_locked_at(now) {
            return Ok(AccessResult::new(AccessState::Free, "Chapter is free"));
        }

        if self.owns(user_id, chapter, entitlement)? {
            return Ok(AccessResult::new(AccessState::Owned, "Already purchased"));
        }

        let balance = self.ledger.get_balance(user_id)?;
        let cost = chapter.cost;
        Ok(if balance >= cost {
            AccessResult::new(
                AccessState::LockedAffordable,
                format!("Sufficient tokens ({balance} >= {cost})"),
            )
        } else {
            AccessResult::new(
                AccessState::LockedUnaffordable,
                format!("Insufficient tokens. Need {cost} tokens, but you only have {balance} tokens"),
            )
        })
    }

    /// Spend tokens to permanently unlock `chapter` for `user_id`.
    ///
    /// Insufficient funds is a failed [`UnlockResult`], not an error. `Err`
    /// means storage failed and nothing was changed.
    pub fn unlock(
        &self,
        user_id: UserId,
        chapter: &ChapterLock,
        entitlement: Option<&EntitlementRecord>,
    ) -> Result<UnlockResult> {
        self.unlock_at(user_id, chapter, entitlement, self.clock.now_millis())
    }

    pub fn unlock_at(
        &self,
        user_id: UserId,
        chapter: &ChapterLock,
        entitlement: Option<&EntitlementRecord>,
        now: u64,
    ) -> Result<UnlockResult> {
        if !chapter.is_locked_at(now) {
            return Ok(UnlockResult {
                success: true,
                message: "Chapter is already free".to_string(),
                tokens_spent: 0,
                remaining_balance: self.ledger.get_balance(user_id)?,
                already_purchased: false,
            });
        }

        if entitlement.is_some_and(|r| record_owns(r, user_id, chapter)) {
            return Ok(already_unlocked(self.ledger.get_balance(user_id)?));
        }

        let cost = chapter.cost;
        let outcome = self.store.write(|tx| {
            let stored = entitlement_rows::get(tx, user_id, chapter.comic_id)?;
            if stored.as_ref().is_some_and(|r| r.is_purchased(chapter.id)) {
                let balance = accounts::balance(tx, user_id)?.unwrap_or(0);
                return Ok(UnlockOutcome::AlreadyOwned { balance });
            }

            // A zero-cost chapter moves no tokens, so it gets no spend record.
            if cost > 0 {
                if !accounts::debit(tx, user_id, cost)? {
                    let balance = accounts::balance(tx, user_id)?.unwrap_or(0);
                    return Ok(UnlockOutcome::Insufficient { balance });
                }
                let entry = spend_entry(user_id, cost, &chapter_label(chapter), now)?;
                transactions::insert(tx, &entry)?;
            }

            mark_purchased_in(tx, user_id, chapter.comic_id, chapter.id, now)?;
            let balance = accounts::balance(tx, user_id)?.unwrap_or(0);
            Ok(UnlockOutcome::Unlocked { balance })
        });

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(user_id, chapter_id = chapter.id, "unlock rolled back: {e}");
                return Err(e);
            }
        };

        Ok(match outcome {
            UnlockOutcome::Unlocked { balance } => {
                tracing::info!(
                    user_id,
                    chapter_id = chapter.id,
                    spent = cost,
                    balance,
                    "chapter unlocked"
                );
                UnlockResult {
                    success: true,
                    message: "Chapter unlocked successfully!".to_string(),
                    tokens_spent: cost,
                    remaining_balance: balance,
                    already_purchased: false,
                }
            }
            UnlockOutcome::AlreadyOwned { balance } => already_unlocked(balance),
            UnlockOutcome::Insufficient { balance } => {
                tracing::warn!(
                    user_id,
                    chapter_id = chapter.id,
                    cost,
                    balance,
                    "unlock rejected: insufficient tokens"
                );
                UnlockResult {
                    success: false,
                    message: format!("Insufficient tokens. Need {cost}, have {balance}"),
                    tokens_spent: 0,
                    remaining_balance: balance,
                    already_purchased: false,
                }
            }
        })
    }

    /// [`Self::evaluate_access`] for a chapter id. `None` if the chapter is
    /// unknown.
    pub fn evaluate_access_by_id(&self, user_id: UserId, chapter_id: ChapterId) -> Result<Option<AccessResult>> {
        let Some(chapter) = self.chapters.chapter(chapter_id)? else {
            return Ok(None);
        };
        self.evaluate_access(user_id, &chapter, None).map(Some)
    }

    /// [`Self::unlock`] for a chapter id. `None` if the chapter is unknown.
    pub fn unlock_by_id(&self, user_id: UserId, chapter_id: ChapterId) -> Result<Option<UnlockResult>> {
        let Some(chapter) = self.chapters.chapter(chapter_id)? else {
            return Ok(None);
        };
        self.unlock(user_id, &chapter, None).map(Some)
    }

    pub fn chapter(&self, chapter_id: ChapterId) -> Result<Option<ChapterLock>> {
        self.chapters.chapter(chapter_id)
    }

    /// Free now, or purchased by `user_id` according to `entitlement`.
    ///
    /// Uses the same ownership rule as [`Self::evaluate_access`]: a record
    /// for another user or comic proves nothing.
    pub fn is_accessible(
        &self,
        user_id: UserId,
        chapter: &ChapterLock,
        entitlement: Option<&EntitlementRecord>,
    ) -> bool {
        !chapter.is_locked_at(self.clock.now_millis())
            || entitlement.is_some_and(|r| record_owns(r, user_id, chapter))
    }

    /// Tokens needed to read `chapter`; 0 if it is already accessible.
    pub fn cost_to_unlock(
        &self,
        user_id: UserId,
        chapter: &ChapterLock,
        entitlement: Option<&EntitlementRecord>,
    ) -> u64 {
        if self.is_accessible(user_id, chapter, entitlement) {
            0
        } else {
            chapter.cost
        }
    }

    pub fn days_until_free(&self, chapter: &ChapterLock) -> u32 {
        chapter.days_until_free_at(self.clock.now_millis())
    }

    /// Credit a shop package and record the purchase as one unit.
    ///
    /// Payment is assumed to have cleared. Returns the new balance, or
    /// `None` if the user has no account.
    pub fn purchase_package(
        &self,
        user_id: UserId,
        package: &TokenPackage,
        payment_method: &str,
    ) -> Result<Option<u64>> {
        let tokens = package.total_tokens();
        let entry = purchase_entry(
            user_id,
            tokens,
            package.price,
            payment_method,
            &package.name,
            self.clock.now_millis(),
        )?;
        let balance = self.credit_with_record(user_id, tokens, &entry)?;
        if let Some(balance) = balance {
            tracing::info!(user_id, package = %package.name, tokens, balance, "token package purchased");
        }
        Ok(balance)
    }

    /// Credit free tokens and record them as a bonus.
    pub fn grant_bonus(&self, user_id: UserId, amount: u64, description: &str) -> Result<Option<u64>> {
        let entry = credit_entry(
            user_id,
            TransactionKind::Bonus,
            amount,
            description,
            self.clock.now_millis(),
        )?;
        self.credit_with_record(user_id, amount, &entry)
    }

    fn credit_with_record(
        &self,
        user_id: UserId,
        amount: u64,
        entry: &panel_types::transaction::NewTransaction,
    ) -> Result<Option<u64>> {
        self.store.write(|tx| {
            if !credit_in(tx, user_id, amount)? {
                return Ok(None);
            }
            transactions::insert(tx, entry)?;
            Ok(accounts::balance(tx, user_id)?)
        })
    }

    fn owns(
        &self,
        user_id: UserId,
        chapter: &ChapterLock,
        entitlement: Option<&EntitlementRecord>,
    ) -> Result<bool> {
        if entitlement.is_some_and(|r| record_owns(r, user_id, chapter)) {
            return Ok(true);
        }
        self.entitlements
            .is_purchased(user_id, chapter.comic_id, chapter.id)
    }
}

impl std::fmt::Debug for AccessControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessControl").finish_non_exhaustive()
    }
}

fn record_owns(record: &EntitlementRecord, user_id: UserId, chapter: &ChapterLock) -> bool {
    record.user_id == user_id && record.comic_id == chapter.comic_id && record.is_purchased(chapter.id)
}

fn already_unlocked(balance: u64) -> UnlockResult {
    UnlockResult {
        success: true,
        message: "Chapter already unlocked".to_string(),
        tokens_spent: 0,
        remaining_balance: balance,
        already_purchased: true,
    }
}

fn chapter_label(chapter: &ChapterLock) -> String {
    if chapter.title.is_empty() {
        format!("Chapter {}", chapter.id)
    } else {
        chapter.title.clone()
    }
}
