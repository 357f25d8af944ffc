//! Entitlement record query functions.
//!
//! Chapter id sets are stored as JSON arrays. `BTreeSet` serializes sorted
//! and deduplicated, so a stored set reads back identical.

use std::collections::BTreeSet;

use rusqlite::{Connection, OptionalExtension, Row};

use panel_types::entitlement::EntitlementRecord;
use panel_types::{ChapterId, ComicId, UserId};

use super::sql_int;
use crate::{DbError, Result};

const COLUMNS: &str = "user_id, comic_id, purchased, bookmarked, liked, viewed,
                       latest_viewed, is_favorite, created_at, updated_at";

/// Insert or overwrite the record for its (user, comic) pair.
pub fn upsert(conn: &Connection, record: &EntitlementRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO entitlements
         (user_id, comic_id, purchased, bookmarked, liked, viewed,
          latest_viewed, is_favorite, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
         ON CONFLICT(user_id, comic_id) DO UPDATE SET
            purchased = excluded.purchased,
            bookmarked = excluded.bookmarked,
            liked = excluded.liked,
            viewed = excluded.viewed,
            latest_viewed = excluded.latest_viewed,
            is_favorite = excluded.is_favorite,
            updated_at = excluded.updated_at",
        rusqlite::params![
            record.user_id,
            record.comic_id,
            encode_ids(&record.purchased)?,
            encode_ids(&record.bookmarked)?,
            encode_ids(&record.liked)?,
            encode_ids(&record.viewed)?,
            record.latest_viewed,
            record.is_favorite,
            sql_int(record.created_at)?,
            sql_int(record.updated_at)?,
        ],
    )?;
    Ok(())
}

/// Fetch the record for a (user, comic) pair.
pub fn get(conn: &Connection, user_id: UserId, comic_id: ComicId) -> Result<Option<EntitlementRecord>> {
    let row = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM entitlements WHERE user_id = ?1 AND comic_id = ?2"),
            [user_id, comic_id],
            RawRow::from_row,
        )
        .optional()?;
    row.map(RawRow::decode).transpose()
}

/// Delete the record. Returns whether one existed.
pub fn delete(conn: &Connection, user_id: UserId, comic_id: ComicId) -> Result<bool> {
    let deleted = conn.execute(
        "DELETE FROM entitlements WHERE user_id = ?1 AND comic_id = ?2",
        [user_id, comic_id],
    )?;
    Ok(deleted > 0)
}

/// All of a user's records, most recently updated first.
pub fn list_for_user(conn: &Connection, user_id: UserId) -> Result<Vec<EntitlementRecord>> {
    query_many(
        conn,
        &format!(
            "SELECT {COLUMNS} FROM entitlements WHERE user_id = ?1
             ORDER BY updated_at DESC, comic_id"
        ),
        rusqlite::params![user_id],
    )
}

/// Records flagged as favorite, most recently updated first.
pub fn favorites(conn: &Connection, user_id: UserId) -> Result<Vec<EntitlementRecord>> {
    query_many(
        conn,
        &format!(
            "SELECT {COLUMNS} FROM entitlements WHERE user_id = ?1 AND is_favorite = 1
             ORDER BY updated_at DESC, comic_id"
        ),
        rusqlite::params![user_id],
    )
}

/// Records with at least one viewed chapter, most recently updated first.
pub fn recently_read(conn: &Connection, user_id: UserId, limit: u32) -> Result<Vec<EntitlementRecord>> {
    query_many(
        conn,
        &format!(
            "SELECT {COLUMNS} FROM entitlements
             WHERE user_id = ?1 AND latest_viewed IS NOT NULL
             ORDER BY updated_at DESC, comic_id LIMIT ?2"
        ),
        rusqlite::params![user_id, limit],
    )
}

fn query_many(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::ToSql],
) -> Result<Vec<EntitlementRecord>> {
    let mut stmt = conn.prepare(sql)?;
    let raws = stmt
        .query_map(params, RawRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    raws.into_iter().map(RawRow::decode).collect()
}

fn encode_ids(ids: &BTreeSet<ChapterId>) -> Result<String> {
    serde_json::to_string(ids).map_err(|e| DbError::Serialization(e.to_string()))
}

fn decode_ids(column: &str, raw: &str) -> Result<BTreeSet<ChapterId>> {
    if raw.is_empty() {
        return Ok(BTreeSet::new());
    }
    serde_json::from_str(raw).map_err(|e| DbError::Serialization(format!("{column}: {e}")))
}

/// Row as read from SQLite, before the id sets are decoded.
struct RawRow {
    user_id: UserId,
    comic_id: ComicId,
    purchased: String,
    bookmarked: String,
    liked: String,
    viewed: String,
    latest_viewed: Option<ChapterId>,
    is_favorite: bool,
    created_at: i64,
    updated_at: i64,
}

impl RawRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            user_id: row.get(0)?,
            comic_id: row.get(1)?,
            purchased: row.get(2)?,
            bookmarked: row.get(3)?,
            liked: row.get(4)?,
            viewed: row.get(5)?,
            latest_viewed: row.get(6)?,
            is_favorite: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }

    fn decode(self) -> Result<EntitlementRecord> {
        Ok(EntitlementRecord {
            user_id: self.user_id,
            comic_id: self.comic_id,
            purchased: decode_ids("purchased", &self.purchased)?,
            bookmarked: decode_ids("bookmarked", &self.bookmarked)?,
            liked: decode_ids("liked", &self.liked)?,
            viewed: decode_ids("viewed", &self.viewed)?,
            latest_viewed: self.latest_viewed,
            is_favorite: self.is_favorite,
            created_at: self.created_at.max(0) as u64,
            updated_at: self.updated_at.max(0) as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        crate::open_memory().expect("open test db")
    }

    #[test]
    fn test_get_missing() {
        let conn = test_db();
        assert!(get(&conn, 1, 1).expect("get").is_none());
    }

    #[test]
    fn test_upsert_round_trip() {
        let conn = test_db();
        let mut rec = EntitlementRecord::empty(1, 5, 1000);
        rec.mark_purchased(12, 1001);
        rec.mark_purchased(3, 1002);
        rec.mark_viewed(3, 1003);
        rec.toggle_bookmark(12, 1004);
        rec.toggle_favorite(1005);
        upsert(&conn, &rec).expect("upsert");

        assert_eq!(get(&conn, 1, 5).expect("get"), Some(rec));
    }

    #[test]
    fn test_upsert_keeps_one_row_per_pair() {
        let conn = test_db();
        let mut rec = EntitlementRecord::empty(1, 5, 1000);
        upsert(&conn, &rec).expect("insert");
        rec.mark_purchased(7, 2000);
        upsert(&conn, &rec).expect("update");

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM entitlements", [], |row| row.get(0))
            .expect("count");
        assert_eq!(count, 1);
        let stored = get(&conn, 1, 5).expect("get").expect("present");
        assert!(stored.is_purchased(7));
        assert_eq!(stored.created_at, 1000);
    }

    #[test]
    fn test_delete() {
        let conn = test_db();
        upsert(&conn, &EntitlementRecord::empty(1, 5, 1000)).expect("insert");
        assert!(delete(&conn, 1, 5).expect("delete"));
        assert!(!delete(&conn, 1, 5).expect("delete again"));
    }

    #[test]
    fn test_corrupt_set_is_serialization_error() {
        let conn = test_db();
        upsert(&conn, &EntitlementRecord::empty(1, 5, 1000)).expect("insert");
        conn.execute("UPDATE entitlements SET purchased = '1,2'", [])
            .expect("corrupt");
        assert!(matches!(get(&conn, 1, 5), Err(DbError::Serialization(_))));
    }

    #[test]
    fn test_listings() {
        let conn = test_db();
        let mut a = EntitlementRecord::empty(1, 10, 1000);
        a.toggle_favorite(1100);
        let mut b = EntitlementRecord::empty(1, 11, 1000);
        b.mark_viewed(4, 1200);
        let other = EntitlementRecord::empty(2, 10, 1000);
        for rec in [&a, &b, &other] {
            upsert(&conn, rec).expect("upsert");
        }

        let all: Vec<_> = list_for_user(&conn, 1)
            .expect("list")
            .into_iter()
            .map(|r| r.comic_id)
            .collect();
        assert_eq!(all, vec![11, 10]);

        let favs = favorites(&conn, 1).expect("favorites");
        assert_eq!(favs.len(), 1);
        assert_eq!(favs[0].comic_id, 10);

        let recent = recently_read(&conn, 1, 10).expect("recent");
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].comic_id, 11);
        assert!(recently_read(&conn, 1, 0).expect("recent").is_empty());
    }
}
