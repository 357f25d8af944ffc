//! IPC command handlers.
//!
//! Each submodule implements the commands for one IPC category.

pub mod access;
pub mod library;
pub mod wallet;

use serde::Serialize;
use serde_json::Value;

use panel_ledger::LedgerError;

use crate::rpc::RpcError;

type Result<T> = std::result::Result<T, RpcError>;

/// Required integer parameter.
fn param_i64(params: &Value, key: &str) -> Result<i64> {
    params
        .get(key)
        .and_then(Value::as_i64)
        .ok_or_else(|| RpcError::invalid_params(&format!("{key} required")))
}

/// Required non-negative integer parameter.
fn param_u64(params: &Value, key: &str) -> Result<u64> {
    params
        .get(key)
        .and_then(Value::as_u64)
        .ok_or_else(|| RpcError::invalid_params(&format!("{key} required")))
}

/// Optional non-negative integer parameter. Present but malformed is an
/// error, not a silent default.
fn opt_u64(params: &Value, key: &str) -> Result<Option<u64>> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .map(Some)
            .ok_or_else(|| RpcError::invalid_params(&format!("{key} must be a non-negative integer"))),
    }
}

fn opt_str<'a>(params: &'a Value, key: &str) -> Option<&'a str> {
    params.get(key).and_then(Value::as_str)
}

fn to_json<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| RpcError::internal_error(&format!("encode error: {e}")))
}

/// Bad arguments are the caller's fault; everything else is ours.
fn ledger_error(e: LedgerError) -> RpcError {
    match e {
        LedgerError::InvalidAmount(_) | LedgerError::BalanceOverflow { .. } => {
            RpcError::invalid_params(&e.to_string())
        }
        _ => RpcError::internal_error(&format!("ledger error: {e}")),
    }
}
