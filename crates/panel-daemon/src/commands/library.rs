//! Reading history and entitlement command handlers.

use std::sync::Arc;

use panel_types::entitlement::ReadingStatus;
use serde_json::Value;

use super::{ledger_error, opt_u64, param_i64, to_json};
use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

/// The stored record for a (user, comic) pair, or `null`.
pub async fn get_entitlement(state: &Arc<DaemonState>, params: &Value) -> Result {
    let user_id = param_i64(params, "user_id")?;
    let comic_id = param_i64(params, "comic_id")?;

    let record = state
        .access
        .entitlements()
        .get(user_id, comic_id)
        .map_err(ledger_error)?;
    to_json(&record)
}

pub async fn mark_viewed(state: &Arc<DaemonState>, params: &Value) -> Result {
    let user_id = param_i64(params, "user_id")?;
    let comic_id = param_i64(params, "comic_id")?;
    let chapter_id = param_i64(params, "chapter_id")?;

    state
        .access
        .entitlements()
        .mark_viewed(user_id, comic_id, chapter_id)
        .map_err(ledger_error)?;
    Ok(serde_json::json!({ "viewed": true }))
}

pub async fn toggle_bookmark(state: &Arc<DaemonState>, params: &Value) -> Result {
    let user_id = param_i64(params, "user_id")?;
    let comic_id = param_i64(params, "comic_id")?;
    let chapter_id = param_i64(params, "chapter_id")?;

    let bookmarked = state
        .access
        .entitlements()
        .toggle_bookmark(user_id, comic_id, chapter_id)
        .map_err(ledger_error)?;
    Ok(serde_json::json!({ "bookmarked": bookmarked }))
}

pub async fn toggle_like(state: &Arc<DaemonState>, params: &Value) -> Result {
    let user_id = param_i64(params, "user_id")?;
    let comic_id = param_i64(params, "comic_id")?;
    let chapter_id = param_i64(params, "chapter_id")?;

    let liked = state
        .access
        .entitlements()
        .toggle_like(user_id, comic_id, chapter_id)
        .map_err(ledger_error)?;
    Ok(serde_json::json!({ "liked": liked }))
}

pub async fn toggle_favorite(state: &Arc<DaemonState>, params: &Value) -> Result {
    let user_id = param_i64(params, "user_id")?;
    let comic_id = param_i64(params, "comic_id")?;

    let favorite = state
        .access
        .entitlements()
        .toggle_favorite(user_id, comic_id)
        .map_err(ledger_error)?;
    Ok(serde_json::json!({ "favorite": favorite }))
}

/// Erase a (user, comic) record, purchases included.
pub async fn delete_entitlement(state: &Arc<DaemonState>, params: &Value) -> Result {
    let user_id = param_i64(params, "user_id")?;
    let comic_id = param_i64(params, "comic_id")?;

    let deleted = state
        .access
        .entitlements()
        .delete(user_id, comic_id)
        .map_err(ledger_error)?;
    Ok(serde_json::json!({ "deleted": deleted }))
}

/// Library overview: counts, favorites, recently read and in-progress comics.
pub async fn get_reading_statistics(state: &Arc<DaemonState>, params: &Value) -> Result {
    let user_id = param_i64(params, "user_id")?;
    let entitlements = state.access.entitlements();

    let stats = entitlements
        .reading_statistics(user_id)
        .map_err(ledger_error)?;
    let favorites: Vec<i64> = entitlements
        .favorites(user_id)
        .map_err(ledger_error)?
        .into_iter()
        .map(|r| r.comic_id)
        .collect();
    let recent: Vec<i64> = entitlements
        .recently_read(user_id, state.config.ledger.recent_limit)
        .map_err(ledger_error)?
        .into_iter()
        .map(|r| r.comic_id)
        .collect();
    let reading = entitlements
        .comics_by_status(user_id, ReadingStatus::Reading)
        .map_err(ledger_error)?;

    Ok(serde_json::json!({
        "total": stats.total,
        "reading": stats.reading,
        "favorites": favorites,
        "recently_read": recent,
        "in_progress": to_json(&reading)?,
    }))
}

/// Counts and progress for one comic, or `null` if never touched.
/// `total_chapters` defaults to the comic's chapters in the catalog.
pub async fn get_reading_summary(state: &Arc<DaemonState>, params: &Value) -> Result {
    let user_id = param_i64(params, "user_id")?;
    let comic_id = param_i64(params, "comic_id")?;
    let total_chapters = match opt_u64(params, "total_chapters")? {
        Some(n) => u32::try_from(n).unwrap_or(u32::MAX),
        None => {
            let chapters = state.catalog.list_by_comic(comic_id).map_err(ledger_error)?;
            u32::try_from(chapters.len()).unwrap_or(u32::MAX)
        }
    };

    let summary = state
        .access
        .entitlements()
        .reading_summary(user_id, comic_id, total_chapters)
        .map_err(ledger_error)?;
    to_json(&summary)
}

pub async fn get_achievements(state: &Arc<DaemonState>, params: &Value) -> Result {
    let user_id = param_i64(params, "user_id")?;
    let comic_id = param_i64(params, "comic_id")?;

    let earned = state
        .access
        .entitlements()
        .achievements(user_id, comic_id)
        .map_err(ledger_error)?;
    to_json(&earned)
}
