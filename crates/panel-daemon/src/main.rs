//! panel-daemon: the Panel token ledger service.
//!
//! Single OS process running a Tokio async runtime. The reader app talks to
//! it via JSON-RPC over a Unix socket.

mod commands;
mod config;
mod rpc;

use std::sync::Arc;

use panel_ledger::{AccessControl, ChapterCatalog, Clock, Store, SystemClock};
use tokio::sync::broadcast;
use tracing::{error, info};

use crate::config::PanelConfig;
use crate::rpc::RpcServer;

/// Daemon-wide shared state.
pub struct DaemonState {
    /// Access control over the shared store.
    pub access: AccessControl,
    /// Chapter metadata, writable through `put_chapter`.
    pub catalog: ChapterCatalog,
    /// Configuration.
    pub config: PanelConfig,
    /// Shutdown signal sender.
    pub shutdown_tx: broadcast::Sender<()>,
}

impl DaemonState {
    pub fn new(store: Store, clock: Arc<dyn Clock>, config: PanelConfig) -> Self {
        let (shutdown_tx, _shutdown_rx) = broadcast::channel(1);
        Self {
            catalog: ChapterCatalog::new(store.clone()),
            access: AccessControl::with_store(store, clock),
            config,
            shutdown_tx,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load config; the log level lives there
    let config = PanelConfig::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("panel={}", config.advanced.log_level).parse()?),
        )
        .init();

    info!("Panel daemon starting");

    let data_dir = config.data_dir();
    std::fs::create_dir_all(&data_dir)?;

    // 2. Open database
    let db_path = data_dir.join("panel.db");
    let store = Store::open(&db_path)?;
    info!("Database open at {:?}", db_path);

    // 3. Build daemon state
    let state = Arc::new(DaemonState::new(store, Arc::new(SystemClock), config));

    // 4. Start IPC server
    let socket_path = data_dir.join("panel.sock");
    let rpc_server = RpcServer::new(state.clone(), socket_path.clone());

    info!("Starting JSON-RPC server on {:?}", socket_path);

    // 5. Run the RPC server until shutdown
    let mut shutdown_rx = state.shutdown_tx.subscribe();
    tokio::select! {
        result = rpc_server.run() => {
            if let Err(e) = result {
                error!("RPC server error: {}", e);
            }
        }
        _ = shutdown_rx.recv() => {
            info!("Shutdown signal received");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
        }
    }

    let _ = std::fs::remove_file(&socket_path);

    info!("Daemon stopped");
    Ok(())
}
