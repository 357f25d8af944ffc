//! Transaction log: the append-only audit trail of balance changes.
//!
//! The log is independent of the ledger. Recording here never moves tokens;
//! callers that move tokens should do both inside one [`Store::write`].

use std::sync::Arc;

use panel_db::queries::transactions;
use panel_types::transaction::{
    NewTransaction, TransactionKind, TransactionRecord, TransactionStatus,
};
use panel_types::{TransactionId, UserId};

use crate::clock::Clock;
use crate::store::Store;
use crate::{positive_amount, Result};

#[derive(Clone)]
pub struct TransactionLog {
    store: Store,
    clock: Arc<dyn Clock>,
}

impl TransactionLog {
    pub fn new(store: Store, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Record tokens bought with money.
    pub fn record_purchase(
        &self,
        user_id: UserId,
        amount: u64,
        price: f64,
        payment_method: &str,
        package_label: &str,
    ) -> Result<TransactionId> {
        let entry = purchase_entry(
            user_id,
            amount,
            price,
            payment_method,
            package_label,
            self.clock.now_millis(),
        )?;
        self.append(&entry)
    }

    /// Record tokens spent on a chapter. Stored as a negative delta.
    pub fn record_spend(&self, user_id: UserId, amount: u64, chapter_label: &str) -> Result<TransactionId> {
        let entry = spend_entry(user_id, amount, chapter_label, self.clock.now_millis())?;
        self.append(&entry)
    }

    pub fn record_bonus(&self, user_id: UserId, amount: u64, description: &str) -> Result<TransactionId> {
        let entry = credit_entry(
            user_id,
            TransactionKind::Bonus,
            amount,
            description,
            self.clock.now_millis(),
        )?;
        self.append(&entry)
    }

    pub fn record_refund(&self, user_id: UserId, amount: u64, description: &str) -> Result<TransactionId> {
        let entry = credit_entry(
            user_id,
            TransactionKind::Refund,
            amount,
            description,
            self.clock.now_millis(),
        )?;
        self.append(&entry)
    }

    /// A user's transactions, most recent first. Each call re-queries.
    pub fn list_for_user(&self, user_id: UserId, limit: Option<u32>) -> Result<Vec<TransactionRecord>> {
        self.store
            .read(|conn| Ok(transactions::list_for_user(conn, user_id, limit)?))
    }

    /// Tokens bought over the user's lifetime.
    pub fn total_purchased(&self, user_id: UserId) -> Result<i64> {
        self.store.read(|conn| {
            Ok(transactions::sum_amount_by_kind(
                conn,
                user_id,
                TransactionKind::Purchase,
            )?)
        })
    }

    /// Money spent on token purchases over the user's lifetime.
    pub fn total_spent_money(&self, user_id: UserId) -> Result<f64> {
        self.store.read(|conn| {
            Ok(transactions::sum_price_by_kind(
                conn,
                user_id,
                TransactionKind::Purchase,
            )?)
        })
    }

    /// Net token delta of all completed transactions.
    ///
    /// For an account opened at zero this equals the current balance.
    pub fn completed_total(&self, user_id: UserId) -> Result<i64> {
        self.store.read(|conn| {
            Ok(transactions::sum_amount_by_status(
                conn,
                user_id,
                TransactionStatus::Completed,
            )?)
        })
    }

    fn append(&self, entry: &NewTransaction) -> Result<TransactionId> {
        let id = self.store.write(|tx| Ok(transactions::insert(tx, entry)?))?;
        tracing::debug!(
            id,
            user_id = entry.user_id,
            kind = entry.kind.as_str(),
            amount = entry.amount,
            "transaction recorded"
        );
        Ok(id)
    }
}

impl std::fmt::Debug for TransactionLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionLog").finish_non_exhaustive()
    }
}

pub(crate) fn purchase_entry(
    user_id: UserId,
    amount: u64,
    price: f64,
    payment_method: &str,
    package_label: &str,
    now: u64,
) -> Result<NewTransaction> {
    let amount = positive_amount(amount)?;
    Ok(NewTransaction {
        price,
        payment_method: payment_method.to_string(),
        package_label: package_label.to_string(),
        ..NewTransaction::completed(
            user_id,
            TransactionKind::Purchase,
            amount,
            format!("Purchased {amount} tokens"),
            now,
        )
    })
}

pub(crate) fn spend_entry(
    user_id: UserId,
    amount: u64,
    chapter_label: &str,
    now: u64,
) -> Result<NewTransaction> {
    let amount = positive_amount(amount)?;
    Ok(NewTransaction::completed(
        user_id,
        TransactionKind::Spend,
        -amount,
        format!("Unlocked: {chapter_label}"),
        now,
    ))
}

pub(crate) fn credit_entry(
    user_id: UserId,
    kind: TransactionKind,
    amount: u64,
    description: &str,
    now: u64,
) -> Result<NewTransaction> {
    let amount = positive_amount(amount)?;
    Ok(NewTransaction::completed(user_id, kind, amount, description, now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::LedgerError;

    fn setup() -> (TransactionLog, Arc<FixedClock>) {
        let store = Store::open_memory().expect("open");
        let clock = Arc::new(FixedClock::new(1_000));
        (TransactionLog::new(store, clock.clone()), clock)
    }

    #[test]
    fn test_record_kinds_and_signs() {
        let (log, clock) = setup();
        log.record_purchase(1, 140, 1.99, "card", "Basic Pack").expect("purchase");
        clock.advance(1);
        log.record_spend(1, 30, "Chapter 4").expect("spend");
        clock.advance(1);
        log.record_bonus(1, 5, "Daily login").expect("bonus");
        clock.advance(1);
        log.record_refund(1, 30, "Refund: Chapter 4").expect("refund");

        let txs = log.list_for_user(1, None).expect("list");
        assert_eq!(txs.len(), 4);
        assert_eq!(txs[0].kind, TransactionKind::Refund);
        assert_eq!(txs[1].amount, 5);
        assert_eq!(txs[2].amount, -30);
        assert_eq!(txs[2].description, "Unlocked: Chapter 4");
        assert_eq!(txs[3].description, "Purchased 140 tokens");
        assert_eq!(txs[3].package_label, "Basic Pack");
        assert!(txs.iter().all(|t| t.status == TransactionStatus::Completed));
    }

    #[test]
    fn test_limit_and_restartable() {
        let (log, clock) = setup();
        for n in 1..=5 {
            log.record_bonus(1, n, "bonus").expect("bonus");
            clock.advance(1);
        }
        let first = log.list_for_user(1, Some(2)).expect("list");
        let again = log.list_for_user(1, Some(2)).expect("list");
        assert_eq!(first, again);
        assert_eq!(first.iter().map(|t| t.amount).collect::<Vec<_>>(), vec![5, 4]);
    }

    #[test]
    fn test_aggregates_cover_purchases_only() {
        let (log, _clock) = setup();
        log.record_purchase(1, 50, 0.99, "card", "Starter Pack").expect("purchase");
        log.record_purchase(1, 350, 4.99, "wallet", "Popular Pack").expect("purchase");
        log.record_bonus(1, 20, "promo").expect("bonus");
        log.record_spend(1, 30, "Chapter 1").expect("spend");

        assert_eq!(log.total_purchased(1).expect("total"), 400);
        assert!((log.total_spent_money(1).expect("money") - 5.98).abs() < 1e-9);
        assert_eq!(log.completed_total(1).expect("net"), 390);
        assert_eq!(log.total_purchased(2).expect("none"), 0);
    }

    #[test]
    fn test_zero_amount_rejected() {
        let (log, _clock) = setup();
        assert!(matches!(
            log.record_spend(1, 0, "Chapter 1"),
            Err(LedgerError::InvalidAmount(0))
        ));
        assert!(log.list_for_user(1, None).expect("list").is_empty());
    }
}
