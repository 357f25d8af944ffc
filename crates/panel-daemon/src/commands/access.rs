//! Chapter access command handlers.

use std::sync::Arc;

use panel_types::chapter::ChapterLock;
use panel_types::ChapterId;
use serde_json::Value;

use super::{ledger_error, param_i64, to_json};
use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

/// Evaluate whether a user may read a chapter right now.
pub async fn evaluate_access(state: &Arc<DaemonState>, params: &Value) -> Result {
    let user_id = param_i64(params, "user_id")?;
    let chapter_id = param_i64(params, "chapter_id")?;

    let result = state
        .access
        .evaluate_access_by_id(user_id, chapter_id)
        .map_err(ledger_error)?
        .ok_or_else(|| RpcError::chapter_not_found(chapter_id))?;
    to_json(&result)
}

/// Spend tokens to unlock a chapter. Insufficient funds comes back as a
/// failed result, not an error.
pub async fn unlock_chapter(state: &Arc<DaemonState>, params: &Value) -> Result {
    let user_id = param_i64(params, "user_id")?;
    let chapter_id = param_i64(params, "chapter_id")?;

    let result = state
        .access
        .unlock_by_id(user_id, chapter_id)
        .map_err(ledger_error)?
        .ok_or_else(|| RpcError::chapter_not_found(chapter_id))?;
    to_json(&result)
}

pub async fn days_until_free(state: &Arc<DaemonState>, params: &Value) -> Result {
    let chapter = lookup(state, param_i64(params, "chapter_id")?)?;
    Ok(serde_json::json!({
        "days": state.access.days_until_free(&chapter),
    }))
}

/// Insert or replace a chapter's lock metadata.
pub async fn put_chapter(state: &Arc<DaemonState>, params: &Value) -> Result {
    let raw = params
        .get("chapter")
        .cloned()
        .ok_or_else(|| RpcError::invalid_params("chapter required"))?;
    let chapter: ChapterLock = serde_json::from_value(raw)
        .map_err(|e| RpcError::invalid_params(&format!("bad chapter: {e}")))?;

    state.catalog.put(&chapter).map_err(ledger_error)?;
    Ok(serde_json::json!({ "chapter_id": chapter.id }))
}

fn lookup(state: &DaemonState, chapter_id: ChapterId) -> std::result::Result<ChapterLock, RpcError> {
    state
        .access
        .chapter(chapter_id)
        .map_err(ledger_error)?
        .ok_or_else(|| RpcError::chapter_not_found(chapter_id))
}
