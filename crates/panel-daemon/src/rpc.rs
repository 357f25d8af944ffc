//! JSON-RPC server over Unix socket.
//!
//! Listens on a Unix domain socket, accepts connections, and dispatches
//! newline-delimited JSON-RPC 2.0 calls to the command handlers.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tracing::{debug, error, info, warn};

use crate::commands;
use crate::DaemonState;

/// JSON-RPC request.
#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    /// JSON-RPC version (must be "2.0").
    pub jsonrpc: String,
    /// Request ID.
    pub id: serde_json::Value,
    /// Method name.
    pub method: String,
    /// Parameters.
    #[serde(default)]
    pub params: serde_json::Value,
}

/// JSON-RPC response.
#[derive(Debug, Serialize)]
pub struct RpcResponse {
    /// JSON-RPC version.
    pub jsonrpc: String,
    /// Request ID.
    pub id: serde_json::Value,
    /// Result or error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// JSON-RPC error object.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RpcError {
    pub code: i32,
    /// Error name.
    pub message: String,
    /// Optional structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcResponse {
    pub fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: serde_json::Value, error: RpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

impl RpcError {
    // Standard JSON-RPC errors

    /// Parse error (-32700).
    pub fn parse_error() -> Self {
        Self {
            code: -32700,
            message: "PARSE_ERROR".to_string(),
            data: None,
        }
    }

    /// Invalid request (-32600).
    pub fn invalid_request() -> Self {
        Self {
            code: -32600,
            message: "INVALID_REQUEST".to_string(),
            data: None,
        }
    }

    /// Method not found (-32601).
    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: "METHOD_NOT_FOUND".to_string(),
            data: Some(serde_json::json!({"method": method})),
        }
    }

    /// Invalid params (-32602).
    pub fn invalid_params(detail: &str) -> Self {
        Self {
            code: -32602,
            message: "INVALID_PARAMS".to_string(),
            data: Some(serde_json::json!({"detail": detail})),
        }
    }

    /// Internal error (-32603).
    pub fn internal_error(detail: &str) -> Self {
        Self {
            code: -32603,
            message: "INTERNAL_ERROR".to_string(),
            data: Some(serde_json::json!({"detail": detail})),
        }
    }

    // Ledger errors

    /// Chapter not found (-32020).
    pub fn chapter_not_found(chapter_id: i64) -> Self {
        Self {
            code: -32020,
            message: "CHAPTER_NOT_FOUND".to_string(),
            data: Some(serde_json::json!({"chapter_id": chapter_id})),
        }
    }

    /// Account not found (-32021).
    pub fn account_not_found(user_id: i64) -> Self {
        Self {
            code: -32021,
            message: "ACCOUNT_NOT_FOUND".to_string(),
            data: Some(serde_json::json!({"user_id": user_id})),
        }
    }
}

/// The RPC server.
pub struct RpcServer {
    state: Arc<DaemonState>,
    socket_path: PathBuf,
}

impl RpcServer {
    pub fn new(state: Arc<DaemonState>, socket_path: PathBuf) -> Self {
        Self { state, socket_path }
    }

    /// Run the server, accepting connections.
    pub async fn run(&self) -> anyhow::Result<()> {
        // Remove stale socket file
        let _ = std::fs::remove_file(&self.socket_path);

        let listener = UnixListener::bind(&self.socket_path)?;
        info!("IPC server listening on {:?}", self.socket_path);

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let state = self.state.clone();
                    tokio::spawn(async move {
                        let (reader, writer) = stream.into_split();
                        if let Err(e) = handle_connection(state, reader, writer).await {
                            warn!("Connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

/// Serve one client: one request per line, one response per line.
async fn handle_connection<R, W>(state: Arc<DaemonState>, reader: R, mut writer: W) -> anyhow::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            break; // EOF
        }
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<RpcRequest>(&line) {
            Ok(request) => dispatch_request(state.clone(), request).await,
            Err(_) => RpcResponse::error(serde_json::Value::Null, RpcError::parse_error()),
        };

        let mut response_json = serde_json::to_string(&response)?;
        response_json.push('\n');
        writer.write_all(response_json.as_bytes()).await?;
        writer.flush().await?;
    }

    Ok(())
}

/// Dispatch a JSON-RPC request to the appropriate command handler.
async fn dispatch_request(state: Arc<DaemonState>, request: RpcRequest) -> RpcResponse {
    let id = request.id.clone();
    let method = request.method.as_str();

    if request.jsonrpc != "2.0" {
        return RpcResponse::error(id, RpcError::invalid_request());
    }

    debug!("Dispatching RPC method: {}", method);

    let params = &request.params;
    let result = match method {
        // Wallet
        "open_account" => commands::wallet::open_account(&state, params).await,
        "get_balance" => commands::wallet::get_balance(&state, params).await,
        "list_transactions" => commands::wallet::list_transactions(&state, params).await,
        "get_spending_summary" => commands::wallet::get_spending_summary(&state, params).await,
        "get_token_packages" => commands::wallet::get_token_packages(&state).await,
        "purchase_package" => commands::wallet::purchase_package(&state, params).await,
        "grant_bonus" => commands::wallet::grant_bonus(&state, params).await,

        // Access
        "evaluate_access" => commands::access::evaluate_access(&state, params).await,
        "unlock_chapter" => commands::access::unlock_chapter(&state, params).await,
        "days_until_free" => commands::access::days_until_free(&state, params).await,
        "put_chapter" => commands::access::put_chapter(&state, params).await,

        // Library
        "get_entitlement" => commands::library::get_entitlement(&state, params).await,
        "mark_viewed" => commands::library::mark_viewed(&state, params).await,
        "toggle_bookmark" => commands::library::toggle_bookmark(&state, params).await,
        "toggle_like" => commands::library::toggle_like(&state, params).await,
        "toggle_favorite" => commands::library::toggle_favorite(&state, params).await,
        "delete_entitlement" => commands::library::delete_entitlement(&state, params).await,
        "get_reading_statistics" => {
            commands::library::get_reading_statistics(&state, params).await
        }
        "get_reading_summary" => commands::library::get_reading_summary(&state, params).await,
        "get_achievements" => commands::library::get_achievements(&state, params).await,

        "shutdown" => {
            info!("Shutdown requested over RPC");
            let _ = state.shutdown_tx.send(());
            Ok(serde_json::json!({"stopping": true}))
        }

        _ => Err(RpcError::method_not_found(method)),
    };

    match result {
        Ok(value) => RpcResponse::success(id, value),
        Err(err) => RpcResponse::error(id, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use panel_ledger::{FixedClock, Store};
    use serde_json::{json, Value};

    use crate::config::PanelConfig;

    fn state() -> Arc<DaemonState> {
        let store = Store::open_memory().expect("open");
        Arc::new(DaemonState::new(
            store,
            Arc::new(FixedClock::new(1_700_000_000_000)),
            PanelConfig::default(),
        ))
    }

    async fn call(state: &Arc<DaemonState>, method: &str, params: Value) -> RpcResponse {
        let request = RpcRequest {
            jsonrpc: "2.0".to_string(),
            id: json!(1),
            method: method.to_string(),
            params,
        };
        dispatch_request(state.clone(), request).await
    }

    #[test]
    fn test_rpc_error_codes() {
        assert_eq!(RpcError::parse_error().code, -32700);
        assert_eq!(RpcError::method_not_found("unknown").code, -32601);

        let err = RpcError::chapter_not_found(7);
        assert_eq!(err.code, -32020);
        assert_eq!(err.message, "CHAPTER_NOT_FOUND");
    }

    #[test]
    fn test_rpc_response_shapes() {
        let ok = RpcResponse::success(json!(1), json!({"balance": 100}));
        assert!(ok.result.is_some() && ok.error.is_none());

        let err = RpcResponse::error(json!(1), RpcError::internal_error("test"));
        assert!(err.result.is_none() && err.error.is_some());
    }

    #[tokio::test]
    async fn test_unknown_method_and_bad_version() {
        let state = state();
        let resp = call(&state, "mint_tokens", Value::Null).await;
        assert_eq!(resp.error.map(|e| e.code), Some(-32601));

        let request = RpcRequest {
            jsonrpc: "1.0".to_string(),
            id: json!(2),
            method: "get_balance".to_string(),
            params: json!({"user_id": 1}),
        };
        let resp = dispatch_request(state, request).await;
        assert_eq!(resp.error.map(|e| e.code), Some(-32600));
    }

    #[tokio::test]
    async fn test_unlock_over_rpc() {
        let state = state();
        call(&state, "open_account", json!({"user_id": 1, "initial_tokens": 40})).await;
        let resp = call(
            &state,
            "put_chapter",
            json!({"chapter": {
                "id": 3, "comic_id": 9, "title": "Chapter 3",
                "is_locked": true, "cost": 30
            }}),
        )
        .await;
        assert!(resp.error.is_none());

        let resp = call(&state, "unlock_chapter", json!({"user_id": 1, "chapter_id": 3})).await;
        let result = resp.result.expect("result");
        assert_eq!(result["success"], json!(true));
        assert_eq!(result["remaining_balance"], json!(10));

        // Insufficient funds is a result, not an RPC error.
        call(&state, "put_chapter", json!({"chapter": {
            "id": 4, "comic_id": 9, "title": "Chapter 4", "is_locked": true, "cost": 30
        }}))
        .await;
        let resp = call(&state, "unlock_chapter", json!({"user_id": 1, "chapter_id": 4})).await;
        assert!(resp.error.is_none());
        assert_eq!(resp.result.expect("result")["success"], json!(false));

        let resp = call(&state, "evaluate_access", json!({"user_id": 1, "chapter_id": 99})).await;
        assert_eq!(resp.error.map(|e| e.code), Some(-32020));
    }

    #[tokio::test]
    async fn test_missing_params() {
        let state = state();
        let resp = call(&state, "unlock_chapter", json!({"user_id": 1})).await;
        assert_eq!(resp.error.map(|e| e.code), Some(-32602));
    }

    #[tokio::test]
    async fn test_malformed_optional_params_are_rejected() {
        let state = state();
        for bad in [json!(-5), json!("50")] {
            let params = json!({"user_id": 1, "initial_tokens": bad});
            let resp = call(&state, "open_account", params).await;
            assert_eq!(resp.error.map(|e| e.code), Some(-32602));
        }
        let resp = call(&state, "get_balance", json!({"user_id": 1})).await;
        assert_eq!(resp.result.expect("result")["balance"], json!(0));

        let resp = call(&state, "open_account", json!({"user_id": 1})).await;
        assert_eq!(resp.result.expect("result")["balance"], json!(100));

        let resp = call(&state, "list_transactions", json!({"user_id": 1, "limit": "ten"})).await;
        assert_eq!(resp.error.map(|e| e.code), Some(-32602));
    }

    #[tokio::test]
    async fn test_reading_summary_and_achievements() {
        let state = state();
        let resp = call(&state, "get_reading_summary", json!({"user_id": 1, "comic_id": 9})).await;
        assert_eq!(resp.result, Some(Value::Null));

        for id in 1..=4 {
            call(&state, "put_chapter", json!({"chapter": {
                "id": id, "comic_id": 9, "title": format!("Chapter {id}"),
                "is_locked": false, "cost": 0
            }}))
            .await;
        }
        for id in 1..=2 {
            let params = json!({"user_id": 1, "comic_id": 9, "chapter_id": id});
            call(&state, "mark_viewed", params).await;
        }

        let resp = call(&state, "get_reading_summary", json!({"user_id": 1, "comic_id": 9})).await;
        let summary = resp.result.expect("result");
        assert_eq!(summary["viewed"], json!(2));
        assert_eq!(summary["progress"], json!(0.5));

        let params = json!({"user_id": 1, "comic_id": 9, "total_chapters": 8});
        let resp = call(&state, "get_reading_summary", params).await;
        assert_eq!(resp.result.expect("result")["progress"], json!(0.25));

        let resp = call(&state, "get_achievements", json!({"user_id": 1, "comic_id": 9})).await;
        assert_eq!(resp.result, Some(json!([])));
    }

    #[tokio::test]
    async fn test_connection_round_trip() {
        let state = state();
        let (client, server) = tokio::io::duplex(4096);
        let (server_read, server_write) = tokio::io::split(server);
        let task = tokio::spawn(handle_connection(state, server_read, server_write));

        let (client_read, mut client_write) = tokio::io::split(client);
        client_write
            .write_all(b"not json\n{\"jsonrpc\":\"2.0\",\"id\":5,\"method\":\"get_balance\",\"params\":{\"user_id\":1}}\n")
            .await
            .expect("write");
        client_write.shutdown().await.expect("shutdown");

        let mut lines = BufReader::new(client_read).lines();
        let first: Value =
            serde_json::from_str(&lines.next_line().await.expect("read").expect("line")).expect("json");
        assert_eq!(first["error"]["code"], json!(-32700));

        let second: Value =
            serde_json::from_str(&lines.next_line().await.expect("read").expect("line")).expect("json");
        assert_eq!(second["id"], json!(5));
        assert_eq!(second["result"]["balance"], json!(0));

        task.await.expect("join").expect("connection");
    }
}
