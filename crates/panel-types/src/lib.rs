//! # panel-types
//!
//! Shared domain types for the Panel comic reader's token economy.
//!
//! Everything in this crate is plain data plus pure arithmetic on that data.
//! Storage lives in `panel-db`, business rules in `panel-ledger`.

pub mod access;
pub mod chapter;
pub mod entitlement;
pub mod package;
pub mod transaction;

/// Common identifier aliases. All identifiers are SQLite row ids.
pub type UserId = i64;
pub type ComicId = i64;
pub type ChapterId = i64;
pub type TransactionId = i64;

/// Milliseconds in one day.
pub const MILLIS_PER_DAY: u64 = 24 * 60 * 60 * 1000;

/// Token balance granted to a newly registered account.
pub const DEFAULT_SIGNUP_TOKENS: u64 = 100;

/// Default page size for "recent" listings.
pub const DEFAULT_RECENT_LIMIT: u32 = 10;

/// Current Unix time in milliseconds.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_now_millis_is_after_2020() {
        assert!(super::now_millis() > 1_577_836_800_000);
    }

    #[test]
    #[ignore] // Run manually to generate bindings
    fn export_ts_bindings() {
        use ts_rs::TS;
        let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../bindings");
        std::fs::create_dir_all(&dir).expect("create bindings dir");
        crate::access::AccessResult::export_all_to(&dir).expect("export");
        crate::access::UnlockResult::export_all_to(&dir).expect("export");
        crate::chapter::ChapterLock::export_all_to(&dir).expect("export");
        crate::entitlement::EntitlementRecord::export_all_to(&dir).expect("export");
        crate::entitlement::ReadingStatistics::export_all_to(&dir).expect("export");
        crate::entitlement::ReadingSummary::export_all_to(&dir).expect("export");
        crate::entitlement::Achievement::export_all_to(&dir).expect("export");
        crate::transaction::TransactionRecord::export_all_to(&dir).expect("export");
        crate::package::TokenPackage::export_all_to(&dir).expect("export");
    }
}
