//! Per-(user, comic) entitlement record.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{ChapterId, ComicId, UserId};

/// A user's durable relationship with one comic.
///
/// `purchased` and `viewed` are append-only. `bookmarked` and `liked`
/// toggle. At most one record exists per (user, comic).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct EntitlementRecord {
    pub user_id: UserId,
    pub comic_id: ComicId,
    pub purchased: BTreeSet<ChapterId>,
    pub bookmarked: BTreeSet<ChapterId>,
    pub liked: BTreeSet<ChapterId>,
    pub viewed: BTreeSet<ChapterId>,
    pub latest_viewed: Option<ChapterId>,
    pub is_favorite: bool,
    /// Epoch millis.
    pub created_at: u64,
    /// Epoch millis.
    pub updated_at: u64,
}

impl EntitlementRecord {
    /// A fresh record with empty sets and default flags.
    pub fn empty(user_id: UserId, comic_id: ComicId, now: u64) -> Self {
        Self {
            user_id,
            comic_id,
            purchased: BTreeSet::new(),
            bookmarked: BTreeSet::new(),
            liked: BTreeSet::new(),
            viewed: BTreeSet::new(),
            latest_viewed: None,
            is_favorite: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_purchased(&self, chapter_id: ChapterId) -> bool {
        self.purchased.contains(&chapter_id)
    }

    /// Add a chapter to the purchased set. Returns `false` if it was
    /// already there, in which case the record is untouched.
    pub fn mark_purchased(&mut self, chapter_id: ChapterId, now: u64) -> bool {
        let added = self.purchased.insert(chapter_id);
        if added {
            self.updated_at = now;
        }
        added
    }

    /// Record a view and make it the most recent one.
    pub fn mark_viewed(&mut self, chapter_id: ChapterId, now: u64) {
        self.viewed.insert(chapter_id);
        self.latest_viewed = Some(chapter_id);
        self.updated_at = now;
    }

    /// Flip bookmark membership. Returns the resulting state.
    pub fn toggle_bookmark(&mut self, chapter_id: ChapterId, now: u64) -> bool {
        self.updated_at = now;
        toggle(&mut self.bookmarked, chapter_id)
    }

    /// Flip like membership. Returns the resulting state.
    pub fn toggle_like(&mut self, chapter_id: ChapterId, now: u64) -> bool {
        self.updated_at = now;
        toggle(&mut self.liked, chapter_id)
    }

    /// Flip the favorite flag. Returns the resulting state.
    pub fn toggle_favorite(&mut self, now: u64) -> bool {
        self.is_favorite = !self.is_favorite;
        self.updated_at = now;
        self.is_favorite
    }

    /// Fraction of `total_chapters` the user has viewed, clamped to 1.0.
    pub fn progress(&self, total_chapters: u32) -> f32 {
        if total_chapters == 0 {
            return 0.0;
        }
        (self.viewed.len() as f32 / total_chapters as f32).min(1.0)
    }

    pub fn summary(&self, total_chapters: u32) -> ReadingSummary {
        ReadingSummary {
            bookmarked: count(&self.bookmarked),
            viewed: count(&self.viewed),
            purchased: count(&self.purchased),
            progress: self.progress(total_chapters),
        }
    }

    /// The milestone reached by the current viewed count, if it sits
    /// exactly on one. Earlier milestones are not repeated.
    pub fn achievements(&self) -> Vec<Achievement> {
        let viewed = self.viewed.len();
        MILESTONES
            .iter()
            .filter(|(at, _, _)| *at == viewed)
            .map(|(_, title, description)| Achievement {
                title: (*title).to_string(),
                description: (*description).to_string(),
            })
            .collect()
    }
}

/// Viewed-chapter counts that earn an achievement.
const MILESTONES: [(usize, &str, &str); 3] = [
    (10, "Chapter Champion", "Read 10 chapters!"),
    (50, "Reading Enthusiast", "Read 50 chapters!"),
    (100, "Page Turner", "Read 100 chapters!"),
];

fn count(set: &BTreeSet<ChapterId>) -> u32 {
    u32::try_from(set.len()).unwrap_or(u32::MAX)
}

fn toggle(set: &mut BTreeSet<ChapterId>, chapter_id: ChapterId) -> bool {
    if set.remove(&chapter_id) {
        false
    } else {
        set.insert(chapter_id);
        true
    }
}

/// Counts over all of a user's entitlement records.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct ReadingStatistics {
    /// Comics the user has interacted with at all.
    pub total: u32,
    /// Comics with at least one viewed chapter.
    pub reading: u32,
}

/// Per-comic reading overview.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct ReadingSummary {
    pub bookmarked: u32,
    pub viewed: u32,
    pub purchased: u32,
    /// Viewed fraction of the comic, in `0.0..=1.0`.
    pub progress: f32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct Achievement {
    pub title: String,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReadingStatus {
    All,
    Reading,
}
