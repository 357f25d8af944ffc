//! Token transaction query functions.

use rusqlite::{Connection, Row};

use panel_types::transaction::{
    NewTransaction, TransactionKind, TransactionRecord, TransactionStatus,
};
use panel_types::{TransactionId, UserId};

use super::sql_int;
use crate::{DbError, Result};

const COLUMNS: &str = "id, user_id, kind, amount, price, payment_method, package_label,
                       description, timestamp, status";

/// Append a transaction. Returns its id.
pub fn insert(conn: &Connection, tx: &NewTransaction) -> Result<TransactionId> {
    conn.execute(
        "INSERT INTO token_transactions
         (user_id, kind, amount, price, payment_method, package_label,
          description, timestamp, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        rusqlite::params![
            tx.user_id,
            tx.kind.as_str(),
            tx.amount,
            tx.price,
            tx.payment_method,
            tx.package_label,
            tx.description,
            sql_int(tx.timestamp)?,
            tx.status.as_str(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// A user's transactions, most recent first.
///
/// Ties on timestamp break by id, so insertion order is preserved within
/// the same millisecond.
pub fn list_for_user(
    conn: &Connection,
    user_id: UserId,
    limit: Option<u32>,
) -> Result<Vec<TransactionRecord>> {
    // SQLite treats a negative LIMIT as unbounded.
    let limit = limit.map_or(-1, i64::from);
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM token_transactions WHERE user_id = ?1
         ORDER BY timestamp DESC, id DESC LIMIT ?2"
    ))?;
    let raws = stmt
        .query_map(rusqlite::params![user_id, limit], RawTx::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    raws.into_iter().map(RawTx::decode).collect()
}

/// Sum of token amounts over a user's records of one kind.
pub fn sum_amount_by_kind(conn: &Connection, user_id: UserId, kind: TransactionKind) -> Result<i64> {
    let total: i64 = conn.query_row(
        "SELECT COALESCE(SUM(amount), 0) FROM token_transactions
         WHERE user_id = ?1 AND kind = ?2",
        rusqlite::params![user_id, kind.as_str()],
        |row| row.get(0),
    )?;
    Ok(total)
}

/// Sum of money paid over a user's records of one kind.
pub fn sum_price_by_kind(conn: &Connection, user_id: UserId, kind: TransactionKind) -> Result<f64> {
    let total: f64 = conn.query_row(
        "SELECT COALESCE(SUM(price), 0.0) FROM token_transactions
         WHERE user_id = ?1 AND kind = ?2",
        rusqlite::params![user_id, kind.as_str()],
        |row| row.get(0),
    )?;
    Ok(total)
}

/// Sum of token amounts over a user's records with the given status.
pub fn sum_amount_by_status(
    conn: &Connection,
    user_id: UserId,
    status: TransactionStatus,
) -> Result<i64> {
    let total: i64 = conn.query_row(
        "SELECT COALESCE(SUM(amount), 0) FROM token_transactions
         WHERE user_id = ?1 AND status = ?2",
        rusqlite::params![user_id, status.as_str()],
        |row| row.get(0),
    )?;
    Ok(total)
}

struct RawTx {
    id: TransactionId,
    user_id: UserId,
    kind: String,
    amount: i64,
    price: f64,
    payment_method: String,
    package_label: String,
    description: String,
    timestamp: i64,
    status: String,
}

impl RawTx {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            kind: row.get(2)?,
            amount: row.get(3)?,
            price: row.get(4)?,
            payment_method: row.get(5)?,
            package_label: row.get(6)?,
            description: row.get(7)?,
            timestamp: row.get(8)?,
            status: row.get(9)?,
        })
    }

    fn decode(self) -> Result<TransactionRecord> {
        let kind = TransactionKind::parse(&self.kind).ok_or_else(|| {
            DbError::Serialization(format!("unknown transaction kind '{}'", self.kind))
        })?;
        let status = TransactionStatus::parse(&self.status).ok_or_else(|| {
            DbError::Serialization(format!("unknown transaction status '{}'", self.status))
        })?;
        Ok(TransactionRecord {
            id: self.id,
            user_id: self.user_id,
            kind,
            amount: self.amount,
            price: self.price,
            payment_method: self.payment_method,
            package_label: self.package_label,
            description: self.description,
            timestamp: self.timestamp.max(0) as u64,
            status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        crate::open_memory().expect("open test db")
    }

    fn purchase(user_id: UserId, amount: i64, price: f64, timestamp: u64) -> NewTransaction {
        NewTransaction {
            price,
            payment_method: "card".to_string(),
            package_label: "Starter Pack".to_string(),
            ..NewTransaction::completed(
                user_id,
                TransactionKind::Purchase,
                amount,
                format!("Purchased {amount} tokens"),
                timestamp,
            )
        }
    }

    #[test]
    fn test_insert_returns_increasing_ids() {
        let conn = test_db();
        let a = insert(&conn, &purchase(1, 50, 0.99, 1000)).expect("insert");
        let b = insert(&conn, &purchase(1, 50, 0.99, 1000)).expect("insert");
        assert!(b > a);
    }

    #[test]
    fn test_list_most_recent_first() {
        let conn = test_db();
        insert(&conn, &purchase(1, 50, 0.99, 1000)).expect("insert");
        insert(
            &conn,
            &NewTransaction::completed(1, TransactionKind::Spend, -30, "Unlocked: Ch 1", 2000),
        )
        .expect("insert");
        insert(
            &conn,
            &NewTransaction::completed(1, TransactionKind::Bonus, 5, "Daily bonus", 2000),
        )
        .expect("insert");
        insert(&conn, &purchase(2, 50, 0.99, 3000)).expect("other user");

        let txs = list_for_user(&conn, 1, None).expect("list");
        let kinds: Vec<_> = txs.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![TransactionKind::Bonus, TransactionKind::Spend, TransactionKind::Purchase]
        );
        assert_eq!(txs[1].amount, -30);

        assert_eq!(list_for_user(&conn, 1, Some(1)).expect("list").len(), 1);
    }

    #[test]
    fn test_aggregates() {
        let conn = test_db();
        insert(&conn, &purchase(1, 50, 0.99, 1000)).expect("insert");
        insert(&conn, &purchase(1, 140, 1.99, 1100)).expect("insert");
        insert(
            &conn,
            &NewTransaction::completed(1, TransactionKind::Spend, -30, "Unlocked: Ch 1", 1200),
        )
        .expect("insert");

        assert_eq!(
            sum_amount_by_kind(&conn, 1, TransactionKind::Purchase).expect("sum"),
            190
        );
        let money = sum_price_by_kind(&conn, 1, TransactionKind::Purchase).expect("sum");
        assert!((money - 2.98).abs() < 1e-9);
        assert_eq!(
            sum_amount_by_status(&conn, 1, TransactionStatus::Completed).expect("sum"),
            160
        );
        assert_eq!(
            sum_amount_by_kind(&conn, 9, TransactionKind::Purchase).expect("sum"),
            0
        );
    }

    #[test]
    fn test_unknown_kind_is_serialization_error() {
        let conn = test_db();
        insert(&conn, &purchase(1, 50, 0.99, 1000)).expect("insert");
        conn.execute("UPDATE token_transactions SET kind = 'GIFT'", [])
            .expect("corrupt");
        assert!(matches!(
            list_for_user(&conn, 1, None),
            Err(DbError::Serialization(_))
        ));
    }
}
