//! Chapter lock descriptor.

use serde::{Deserialize, Serialize};

use crate::{ChapterId, ComicId, MILLIS_PER_DAY};

/// The access-relevant slice of a chapter.
///
/// `free_at` is the single source of truth for lock state whenever it is set:
/// before it the chapter is locked regardless of `is_locked`, from it onwards
/// the chapter is free regardless of `is_locked`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct ChapterLock {
    pub id: ChapterId,
    pub comic_id: ComicId,
    /// Display label, used in transaction descriptions.
    pub title: String,
    /// Legacy lock flag. Only consulted when `free_at` is absent.
    pub is_locked: bool,
    /// Token cost while locked.
    pub cost: u64,
    /// Legacy "free in N days" counter. Display only.
    #[serde(default)]
    pub free_days: u32,
    /// Epoch millis at which the chapter becomes free for everyone.
    #[serde(default)]
    pub free_at: Option<u64>,
}

impl ChapterLock {
    /// Whether the chapter is locked at `now` (epoch millis).
    ///
    /// The boundary belongs to the free side: at exactly `free_at` the
    /// chapter is already free.
    pub fn is_locked_at(&self, now: u64) -> bool {
        match self.free_at {
            Some(free_at) => now < free_at,
            None => self.is_locked,
        }
    }

    /// Whole days until the chapter becomes free, floor-rounded.
    ///
    /// Falls back to the legacy `free_days` counter when no `free_at`
    /// timestamp is set.
    pub fn days_until_free_at(&self, now: u64) -> u32 {
        match self.free_at {
            Some(free_at) if free_at > now => {
                u32::try_from((free_at - now) / MILLIS_PER_DAY).unwrap_or(u32::MAX)
            }
            Some(_) => 0,
            None => self.free_days,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_700_000_000_000;

    fn chapter(is_locked: bool, free_at: Option<u64>) -> ChapterLock {
        ChapterLock {
            id: 1,
            comic_id: 1,
            title: "Chapter 1".to_string(),
            is_locked,
            cost: 30,
            free_days: 5,
            free_at,
        }
    }

    #[test]
    fn test_legacy_flag_without_free_at() {
        assert!(chapter(true, None).is_locked_at(NOW));
        assert!(!chapter(false, None).is_locked_at(NOW));
    }

    #[test]
    fn test_past_free_at_overrides_lock_flag() {
        assert!(!chapter(true, Some(NOW - 1)).is_locked_at(NOW));
    }

    #[test]
    fn test_future_free_at_overrides_unlocked_flag() {
        assert!(chapter(false, Some(NOW + MILLIS_PER_DAY)).is_locked_at(NOW));
    }

    #[test]
    fn test_free_at_boundary_is_free() {
        assert!(!chapter(true, Some(NOW)).is_locked_at(NOW));
        assert!(chapter(true, Some(NOW + 1)).is_locked_at(NOW));
    }

    #[test]
    fn test_days_until_free_floors() {
        let ch = chapter(true, Some(NOW + 2 * MILLIS_PER_DAY + MILLIS_PER_DAY / 2));
        assert_eq!(ch.days_until_free_at(NOW), 2);

        let ch = chapter(true, Some(NOW + MILLIS_PER_DAY - 1));
        assert_eq!(ch.days_until_free_at(NOW), 0);
    }

    #[test]
    fn test_days_until_free_clamps_past() {
        let ch = chapter(true, Some(NOW - 10 * MILLIS_PER_DAY));
        assert_eq!(ch.days_until_free_at(NOW), 0);
    }

    #[test]
    fn test_days_until_free_legacy_fallback() {
        assert_eq!(chapter(true, None).days_until_free_at(NOW), 5);
    }
}
