//! Chapter lock metadata query functions.

use rusqlite::{Connection, OptionalExtension, Row};

use panel_types::chapter::ChapterLock;
use panel_types::{ChapterId, ComicId};

use super::sql_int;
use crate::Result;

const COLUMNS: &str = "id, comic_id, title, is_locked, cost, free_days, free_at";

/// Insert or replace a chapter's lock metadata.
pub fn upsert(conn: &Connection, chapter: &ChapterLock) -> Result<()> {
    let free_at = chapter.free_at.map(sql_int).transpose()?;
    conn.execute(
        "INSERT INTO chapters (id, comic_id, title, is_locked, cost, free_days, free_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(id) DO UPDATE SET
            comic_id = excluded.comic_id,
            title = excluded.title,
            is_locked = excluded.is_locked,
            cost = excluded.cost,
            free_days = excluded.free_days,
            free_at = excluded.free_at",
        rusqlite::params![
            chapter.id,
            chapter.comic_id,
            chapter.title,
            chapter.is_locked,
            sql_int(chapter.cost)?,
            chapter.free_days,
            free_at,
        ],
    )?;
    Ok(())
}

/// Fetch one chapter, or `None` if unknown.
pub fn get(conn: &Connection, id: ChapterId) -> Result<Option<ChapterLock>> {
    let chapter = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM chapters WHERE id = ?1"),
            [id],
            from_row,
        )
        .optional()?;
    Ok(chapter)
}

/// All chapters of a comic, in id order.
pub fn list_by_comic(conn: &Connection, comic_id: ComicId) -> Result<Vec<ChapterLock>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM chapters WHERE comic_id = ?1 ORDER BY id"
    ))?;
    let rows = stmt
        .query_map([comic_id], from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<ChapterLock> {
    Ok(ChapterLock {
        id: row.get(0)?,
        comic_id: row.get(1)?,
        title: row.get(2)?,
        is_locked: row.get(3)?,
        cost: row.get::<_, i64>(4)?.max(0) as u64,
        free_days: row.get(5)?,
        free_at: row.get::<_, Option<i64>>(6)?.map(|t| t.max(0) as u64),
    })
}
