// Pulseboard server binary
//
// Wires the core runtime to the HTTP surface. PULSE_DATA_DIR selects
// the RocksDB store; without it everything lives in memory and the
// synthetic fallback carries the dashboard.

use pulseboard_core::store::{MemoryStore, RocksStore};
use pulseboard_core::{CoreConfig, Pulseboard, Store};
use pulseboard_server::{ApiServer, AppState, ServerConfig};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let server_config = ServerConfig::from_env();
    let core_config = CoreConfig::from_env();

    let store: Arc<dyn Store> = match &server_config.data_dir {
        Some(path) => {
            info!(target: "server", path = %path.display(), "Opening RocksDB store");
            Arc::new(RocksStore::open(path)?)
        }
        None => {
            info!(target: "server", "No data directory configured; using in-memory store");
            MemoryStore::new()
        }
    };

    let mut board = Pulseboard::new(core_config, store);
    board.start();

    let state = AppState {
        hub: Arc::clone(&board.hub),
        source: Arc::clone(&board.source),
        deployer: Arc::clone(&board.deployer),
    };

    let server = ApiServer::new(server_config, state);
    tokio::select! {
        result = server.serve() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!(target: "server", "Received shutdown signal");
        }
    }

    board.shutdown().await;
    Ok(())
}
