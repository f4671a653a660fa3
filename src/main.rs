use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use limsd::api::{start_server, AppState, ServerConfig};
use limsd::store::MemoryStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("limsd=info".parse()?))
        .init();

    tracing::info!("limsd starting...");

    let store = Arc::new(MemoryStore::new());
    let state = Arc::new(AppState::new(store));

    let config = ServerConfig::from_env();
    start_server(config, state, shutdown_signal()).await?;

    tracing::info!("limsd stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
