//! Wallet and token shop command handlers.

use std::sync::Arc;

use panel_types::package::TokenPackage;
use serde_json::Value;

use super::{ledger_error, opt_str, opt_u64, param_i64, param_u64, to_json};
use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

/// Register a user's balance. `initial_tokens` defaults to the configured
/// signup grant.
pub async fn open_account(state: &Arc<DaemonState>, params: &Value) -> Result {
    let user_id = param_i64(params, "user_id")?;
    let initial_tokens =
        opt_u64(params, "initial_tokens")?.unwrap_or(state.config.ledger.signup_tokens);

    let ledger = state.access.ledger();
    let created = ledger
        .open_account(user_id, initial_tokens)
        .map_err(ledger_error)?;
    let balance = ledger.get_balance(user_id).map_err(ledger_error)?;

    Ok(serde_json::json!({
        "created": created,
        "balance": balance,
    }))
}

pub async fn get_balance(state: &Arc<DaemonState>, params: &Value) -> Result {
    let user_id = param_i64(params, "user_id")?;
    let balance = state.access.get_balance(user_id).map_err(ledger_error)?;
    Ok(serde_json::json!({ "balance": balance }))
}

/// Most recent transactions first. `limit` defaults to the configured page
/// size; `0` returns everything.
pub async fn list_transactions(state: &Arc<DaemonState>, params: &Value) -> Result {
    let user_id = param_i64(params, "user_id")?;
    let limit = match opt_u64(params, "limit")? {
        Some(0) => None,
        Some(n) => Some(u32::try_from(n).unwrap_or(u32::MAX)),
        None => Some(state.config.ledger.recent_limit),
    };

    let txs = state
        .access
        .log()
        .list_for_user(user_id, limit)
        .map_err(ledger_error)?;
    to_json(&txs)
}

pub async fn get_spending_summary(state: &Arc<DaemonState>, params: &Value) -> Result {
    let user_id = param_i64(params, "user_id")?;
    let log = state.access.log();

    Ok(serde_json::json!({
        "balance": state.access.get_balance(user_id).map_err(ledger_error)?,
        "total_tokens_purchased": log.total_purchased(user_id).map_err(ledger_error)?,
        "total_money_spent": log.total_spent_money(user_id).map_err(ledger_error)?,
        "completed_total": log.completed_total(user_id).map_err(ledger_error)?,
    }))
}

pub async fn get_token_packages(_state: &Arc<DaemonState>) -> Result {
    to_json(&TokenPackage::catalog())
}

/// Credit a shop package. The payment itself is handled upstream.
pub async fn purchase_package(state: &Arc<DaemonState>, params: &Value) -> Result {
    let user_id = param_i64(params, "user_id")?;
    let package_id = param_u64(params, "package_id")?;
    let payment_method = opt_str(params, "payment_method").unwrap_or("card");

    let package = u32::try_from(package_id)
        .ok()
        .and_then(TokenPackage::find)
        .ok_or_else(|| RpcError::invalid_params(&format!("unknown package {package_id}")))?;

    let balance = state
        .access
        .purchase_package(user_id, &package, payment_method)
        .map_err(ledger_error)?
        .ok_or_else(|| RpcError::account_not_found(user_id))?;

    Ok(serde_json::json!({
        "tokens_added": package.total_tokens(),
        "balance": balance,
    }))
}

pub async fn grant_bonus(state: &Arc<DaemonState>, params: &Value) -> Result {
    let user_id = param_i64(params, "user_id")?;
    let amount = param_u64(params, "amount")?;
    let description = opt_str(params, "description").unwrap_or("Bonus tokens");

    let balance = state
        .access
        .grant_bonus(user_id, amount, description)
        .map_err(ledger_error)?
        .ok_or_else(|| RpcError::account_not_found(user_id))?;

    Ok(serde_json::json!({ "balance": balance }))
}
