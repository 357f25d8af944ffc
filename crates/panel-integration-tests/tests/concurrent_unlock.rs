//! Integration test: concurrent unlocks against one balance.
//!
//! Threads share a single `Store`. Each unlock runs debit, spend record and
//! entitlement mark in one immediate transaction, so:
//! 1. Two chapters each costing the whole balance: exactly one unlocks
//! 2. The same chapter unlocked from many threads: charged exactly once
//! 3. The balance and the completed transaction total always agree

use std::sync::Arc;
use std::thread;

use panel_ledger::{AccessControl, FixedClock, Store};
use panel_types::access::UnlockResult;
use panel_types::chapter::ChapterLock;

const NOW: u64 = 1_700_000_000_000;
const USER: i64 = 1;

fn setup(balance: u64) -> AccessControl {
    let access = AccessControl::with_store(
        Store::open_memory().expect("open"),
        Arc::new(FixedClock::new(NOW)),
    );
    access.ledger().open_account(USER, balance).expect("open account");
    access
}

fn chapter(id: i64, cost: u64) -> ChapterLock {
    ChapterLock {
        id,
        comic_id: 5,
        title: format!("Chapter {id}"),
        is_locked: true,
        cost,
        free_days: 0,
        free_at: None,
    }
}

fn unlock_all(access: &AccessControl, chapters: &[ChapterLock]) -> Vec<UnlockResult> {
    thread::scope(|s| {
        let handles: Vec<_> = chapters
            .iter()
            .map(|ch| s.spawn(move || access.unlock(USER, ch, None).expect("unlock")))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("thread"))
            .collect()
    })
}

#[test]
fn balance_covers_only_one_of_two_chapters() {
    for _ in 0..20 {
        let access = setup(30);
        let results = unlock_all(&access, &[chapter(1, 30), chapter(2, 30)]);

        assert_eq!(results.iter().filter(|r| r.success).count(), 1);
        let failed = results.iter().find(|r| !r.success).expect("one failure");
        assert_eq!(failed.tokens_spent, 0);
        assert_eq!(failed.remaining_balance, 0);

        assert_eq!(access.get_balance(USER).expect("balance"), 0);
        assert_eq!(access.log().list_for_user(USER, None).expect("log").len(), 1);
    }
}

#[test]
fn same_chapter_is_charged_once() {
    let access = setup(100);
    let ch = chapter(1, 30);
    let results = unlock_all(&access, &vec![ch; 8]);

    assert!(results.iter().all(|r| r.success));
    assert_eq!(results.iter().filter(|r| !r.already_purchased).count(), 1);
    assert_eq!(results.iter().map(|r| r.tokens_spent).sum::<u64>(), 30);
    assert_eq!(access.get_balance(USER).expect("balance"), 70);
}

#[test]
fn ledger_matches_log_after_contention() {
    let access = setup(0);
    access.grant_bonus(USER, 100, "Welcome").expect("bonus");

    let chapters: Vec<_> = (1..=6).map(|id| chapter(id, 25)).collect();
    let results = unlock_all(&access, &chapters);

    assert_eq!(results.iter().filter(|r| r.success).count(), 4);
    let balance = access.get_balance(USER).expect("balance");
    assert_eq!(balance, 0);
    assert_eq!(
        access.log().completed_total(USER).expect("net"),
        i64::try_from(balance).expect("fits")
    );
}
