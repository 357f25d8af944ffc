//! Chapter lock metadata lookup.

use panel_db::queries::chapters;
use panel_types::chapter::ChapterLock;
use panel_types::{ChapterId, ComicId};

use crate::store::Store;
use crate::Result;

/// Resolve a chapter id to its lock descriptor.
pub trait ChapterLookup: Send + Sync {
    /// `None` for an unknown chapter.
    fn chapter(&self, id: ChapterId) -> Result<Option<ChapterLock>>;
}

/// Chapter lookup backed by the `chapters` table.
#[derive(Clone, Debug)]
pub struct ChapterCatalog {
    store: Store,
}

impl ChapterCatalog {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Insert or replace a chapter's lock metadata.
    pub fn put(&self, chapter: &ChapterLock) -> Result<()> {
        self.store.write(|tx| Ok(chapters::upsert(tx, chapter)?))?;
        tracing::debug!(chapter_id = chapter.id, comic_id = chapter.comic_id, "chapter stored");
        Ok(())
    }

    pub fn list_by_comic(&self, comic_id: ComicId) -> Result<Vec<ChapterLock>> {
        self.store
            .read(|conn| Ok(chapters::list_by_comic(conn, comic_id)?))
    }
}

impl ChapterLookup for ChapterCatalog {
    fn chapter(&self, id: ChapterId) -> Result<Option<ChapterLock>> {
        self.store.read(|conn| Ok(chapters::get(conn, id)?))
    }
}
