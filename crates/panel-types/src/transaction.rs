//! Token transaction records.

use serde::{Deserialize, Serialize};

use crate::{TransactionId, UserId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Tokens bought with money.
    Purchase,
    /// Tokens spent on a chapter.
    Spend,
    /// Free tokens (promotions, daily rewards).
    Bonus,
    /// Tokens given back.
    Refund,
}

impl TransactionKind {
    /// Storage representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Purchase => "PURCHASE",
            Self::Spend => "SPEND",
            Self::Bonus => "BONUS",
            Self::Refund => "REFUND",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PURCHASE" => Some(Self::Purchase),
            "SPEND" => Some(Self::Spend),
            "BONUS" => Some(Self::Bonus),
            "REFUND" => Some(Self::Refund),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl TransactionStatus {
    /// Storage representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Refunded => "REFUNDED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "COMPLETED" => Some(Self::Completed),
            "FAILED" => Some(Self::Failed),
            "REFUNDED" => Some(Self::Refunded),
            _ => None,
        }
    }
}

/// A persisted, immutable transaction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct TransactionRecord {
    pub id: TransactionId,
    pub user_id: UserId,
    pub kind: TransactionKind,
    /// Signed token delta: negative for spends, positive otherwise.
    pub amount: i64,
    /// Money paid. Only meaningful for purchases.
    pub price: f64,
    pub payment_method: String,
    pub package_label: String,
    pub description: String,
    /// Epoch millis.
    pub timestamp: u64,
    pub status: TransactionStatus,
}

/// A transaction about to be appended.
#[derive(Clone, Debug, PartialEq)]
pub struct NewTransaction {
    pub user_id: UserId,
    pub kind: TransactionKind,
    pub amount: i64,
    pub price: f64,
    pub payment_method: String,
    pub package_label: String,
    pub description: String,
    pub timestamp: u64,
    pub status: TransactionStatus,
}

impl NewTransaction {
    /// A completed transaction with no monetary component.
    pub fn completed(
        user_id: UserId,
        kind: TransactionKind,
        amount: i64,
        description: impl Into<String>,
        timestamp: u64,
    ) -> Self {
        Self {
            user_id,
            kind,
            amount,
            price: 0.0,
            payment_method: String::new(),
            package_label: String::new(),
            description: description.into(),
            timestamp,
            status: TransactionStatus::Completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_storage_names() {
        for kind in [
            TransactionKind::Purchase,
            TransactionKind::Spend,
            TransactionKind::Bonus,
            TransactionKind::Refund,
        ] {
            assert_eq!(TransactionKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(TransactionKind::parse("purchase"), None);
    }

    #[test]
    fn test_status_storage_names() {
        assert_eq!(
            TransactionStatus::parse("COMPLETED"),
            Some(TransactionStatus::Completed)
        );
        assert_eq!(TransactionStatus::parse("DONE"), None);
    }
}
