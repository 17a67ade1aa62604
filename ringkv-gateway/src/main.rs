use std::sync::Arc;

use ringkv_base::config::GatewayConfig;
use ringkv_gateway::{poll, AppState};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let config = GatewayConfig::from_env().map_err(|e| format!("invalid configuration: {e}"))?;
    tracing::info!(category = "startup", seed_node = %config.seed_node, listen_addr = %config.listen_addr, "starting ringkv-gateway");

    let listen_addr = config.listen_addr;
    let state = Arc::new(AppState::new(config));

    tokio::spawn(poll::run(state.clone()));

    let app = ringkv_gateway::build_router(state);
    let listener = TcpListener::bind(listen_addr).await?;
    tracing::info!(category = "startup", addr = %listen_addr, "ringkv-gateway listening");

    axum::serve(listener, app).await?;
    Ok(())
}
