//! Stockpile mock backend entry point.

use stockpile_server::{init_tracing, router, InventoryStore, Seed, ServerConfig, ServerError, ServerResult};

#[tokio::main]
async fn main() -> ServerResult<()> {
    init_tracing()?;

    let config = ServerConfig::from_env()?;
    let store = match &config.seed_path {
        Some(path) => InventoryStore::with_seed(Seed::from_path(path)?),
        None => InventoryStore::new(),
    };

    let app = router(store);
    let addr = config.addr;
    tracing::info!(%addr, "Starting Stockpile mock backend");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::internal(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ServerError::internal(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
