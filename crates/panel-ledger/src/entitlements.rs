//! Entitlement store: what a user owns, bookmarked, liked and read.
//!
//! Records are created lazily on the first mutation for a (user, comic)
//! pair and only disappear through [`EntitlementStore::delete`].

use std::sync::Arc;

use rusqlite::Connection;

use panel_db::queries::entitlements;
use panel_types::entitlement::{
    Achievement, EntitlementRecord, ReadingStatistics, ReadingStatus, ReadingSummary,
};
use panel_types::{ChapterId, ComicId, UserId};

use crate::clock::Clock;
use crate::store::Store;
use crate::Result;

#[derive(Clone)]
pub struct EntitlementStore {
    store: Store,
    clock: Arc<dyn Clock>,
}

impl EntitlementStore {
    pub fn new(store: Store, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// The stored record, without creating one.
    pub fn get(&self, user_id: UserId, comic_id: ComicId) -> Result<Option<EntitlementRecord>> {
        self.store
            .read(|conn| Ok(entitlements::get(conn, user_id, comic_id)?))
    }

    /// The stored record, creating and persisting an empty one if needed.
    pub fn get_or_create(&self, user_id: UserId, comic_id: ComicId) -> Result<EntitlementRecord> {
        let now = self.clock.now_millis();
        self.store.write(|tx| {
            if let Some(existing) = entitlements::get(tx, user_id, comic_id)? {
                return Ok(existing);
            }
            let record = EntitlementRecord::empty(user_id, comic_id, now);
            entitlements::upsert(tx, &record)?;
            tracing::debug!(user_id, comic_id, "entitlement record created");
            Ok(record)
        })
    }

    /// Add a chapter to the purchased set. Returns `false` if it was
    /// already purchased.
    pub fn mark_purchased(&self, user_id: UserId, comic_id: ComicId, chapter_id: ChapterId) -> Result<bool> {
        let now = self.clock.now_millis();
        self.store
            .write(|tx| mark_purchased_in(tx, user_id, comic_id, chapter_id, now))
    }

    pub fn is_purchased(&self, user_id: UserId, comic_id: ComicId, chapter_id: ChapterId) -> Result<bool> {
        Ok(self
            .get(user_id, comic_id)?
            .is_some_and(|r| r.is_purchased(chapter_id)))
    }

    /// Record a view and make it the most recent one.
    pub fn mark_viewed(&self, user_id: UserId, comic_id: ComicId, chapter_id: ChapterId) -> Result<()> {
        self.update(user_id, comic_id, |record, now| record.mark_viewed(chapter_id, now))?;
        tracing::debug!(user_id, comic_id, chapter_id, "chapter viewed");
        Ok(())
    }

    /// Returns whether the chapter is bookmarked afterwards.
    pub fn toggle_bookmark(&self, user_id: UserId, comic_id: ComicId, chapter_id: ChapterId) -> Result<bool> {
        self.update(user_id, comic_id, |record, now| {
            record.toggle_bookmark(chapter_id, now)
        })
    }

    /// Returns whether the chapter is liked afterwards.
    pub fn toggle_like(&self, user_id: UserId, comic_id: ComicId, chapter_id: ChapterId) -> Result<bool> {
        self.update(user_id, comic_id, |record, now| record.toggle_like(chapter_id, now))
    }

    /// Returns whether the comic is a favorite afterwards.
    pub fn toggle_favorite(&self, user_id: UserId, comic_id: ComicId) -> Result<bool> {
        let favorite = self.update(user_id, comic_id, |record, now| record.toggle_favorite(now))?;
        tracing::debug!(user_id, comic_id, favorite, "favorite toggled");
        Ok(favorite)
    }

    /// Erase the whole record. Returns whether one existed.
    pub fn delete(&self, user_id: UserId, comic_id: ComicId) -> Result<bool> {
        let deleted = self
            .store
            .write(|tx| Ok(entitlements::delete(tx, user_id, comic_id)?))?;
        if deleted {
            tracing::info!(user_id, comic_id, "entitlement record deleted");
        }
        Ok(deleted)
    }

    /// Every record of a user, most recently updated first.
    pub fn list_for_user(&self, user_id: UserId) -> Result<Vec<EntitlementRecord>> {
        self.store
            .read(|conn| Ok(entitlements::list_for_user(conn, user_id)?))
    }

    pub fn favorites(&self, user_id: UserId) -> Result<Vec<EntitlementRecord>> {
        self.store
            .read(|conn| Ok(entitlements::favorites(conn, user_id)?))
    }

    pub fn recently_read(&self, user_id: UserId, limit: u32) -> Result<Vec<EntitlementRecord>> {
        self.store
            .read(|conn| Ok(entitlements::recently_read(conn, user_id, limit)?))
    }

    pub fn reading_statistics(&self, user_id: UserId) -> Result<ReadingStatistics> {
        let records = self.list_for_user(user_id)?;
        let reading = records.iter().filter(|r| !r.viewed.is_empty()).count();
        Ok(ReadingStatistics {
            total: u32::try_from(records.len()).unwrap_or(u32::MAX),
            reading: u32::try_from(reading).unwrap_or(u32::MAX),
        })
    }

    pub fn comics_by_status(&self, user_id: UserId, status: ReadingStatus) -> Result<Vec<ComicId>> {
        Ok(self
            .list_for_user(user_id)?
            .into_iter()
            .filter(|r| status == ReadingStatus::All || !r.viewed.is_empty())
            .map(|r| r.comic_id)
            .collect())
    }

    /// Viewed fraction of a comic with `total_chapters` chapters.
    pub fn overall_progress(&self, user_id: UserId, comic_id: ComicId, total_chapters: u32) -> Result<f32> {
        Ok(self
            .get(user_id, comic_id)?
            .map_or(0.0, |r| r.progress(total_chapters)))
    }

    /// Counts and progress for one comic. `None` if the user never touched it.
    pub fn reading_summary(
        &self,
        user_id: UserId,
        comic_id: ComicId,
        total_chapters: u32,
    ) -> Result<Option<ReadingSummary>> {
        Ok(self
            .get(user_id, comic_id)?
            .map(|r| r.summary(total_chapters)))
    }

    /// Milestones the current viewed count sits on. Empty without a record.
    pub fn achievements(&self, user_id: UserId, comic_id: ComicId) -> Result<Vec<Achievement>> {
        let earned = self
            .get(user_id, comic_id)?
            .map(|r| r.achievements())
            .unwrap_or_default();
        if !earned.is_empty() {
            tracing::info!(user_id, comic_id, count = earned.len(), "achievement reached");
        }
        Ok(earned)
    }

    /// Load-or-create, mutate, persist: all in one transaction.
    fn update<T>(
        &self,
        user_id: UserId,
        comic_id: ComicId,
        f: impl FnOnce(&mut EntitlementRecord, u64) -> T,
    ) -> Result<T> {
        let now = self.clock.now_millis();
        self.store.write(|tx| {
            let mut record = entitlements::get(tx, user_id, comic_id)?
                .unwrap_or_else(|| EntitlementRecord::empty(user_id, comic_id, now));
            let value = f(&mut record, now);
            entitlements::upsert(tx, &record)?;
            Ok(value)
        })
    }
}

/// Mark a chapter purchased on an open connection or transaction.
///
/// A record that already holds the chapter is not rewritten.
pub(crate) fn mark_purchased_in(
    conn: &Connection,
    user_id: UserId,
    comic_id: ComicId,
    chapter_id: ChapterId,
    now: u64,
) -> Result<bool> {
    let mut record = entitlements::get(conn, user_id, comic_id)?
        .unwrap_or_else(|| EntitlementRecord::empty(user_id, comic_id, now));
    if !record.mark_purchased(chapter_id, now) {
        return Ok(false);
    }
    entitlements::upsert(conn, &record)?;
    Ok(true)
}

impl std::fmt::Debug for EntitlementStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntitlementStore").finish_non_exhaustive()
    }
}
