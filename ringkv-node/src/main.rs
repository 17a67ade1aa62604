use std::sync::Arc;

use ringkv_base::config::NodeConfig;
use ringkv_node::{bootstrap, gossip, health};
use ringkv_node::{anti_entropy, AppState};
use ringkv_store::redb_store::RedbStore;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let config = NodeConfig::from_env().map_err(|e| format!("invalid configuration: {e}"))?;
    tracing::info!(category = "startup", node_addr = %config.node_addr, listen_addr = %config.listen_addr, "starting ringkv-node");

    let store = Arc::new(RedbStore::open(&config.db_file)?);
    let state = Arc::new(AppState::new(store, config.clone()));

    if let Some(seed) = &config.seed_node {
        bootstrap::join_via_seed(&state, seed).await;
    }

    tokio::spawn(gossip::run(state.clone()));
    tokio::spawn(health::run(state.clone()));

    anti_entropy::initial_sync(&state).await;
    tokio::spawn(anti_entropy::run(state.clone()));

    let app = ringkv_node::build_router(state);
    let listener = TcpListener::bind(config.listen_addr).await?;
    tracing::info!(category = "startup", addr = %config.listen_addr, "ringkv-node listening");

    axum::serve(listener, app).await?;
    Ok(())
}
