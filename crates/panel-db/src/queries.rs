//! Database query functions organized by table.

pub mod accounts;
pub mod chapters;
pub mod entitlements;
pub mod transactions;

use crate::{DbError, Result};

/// Convert an unsigned quantity to SQLite's signed integer.
pub(crate) fn sql_int(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| DbError::Constraint(format!("{value} exceeds i64 range")))
}
