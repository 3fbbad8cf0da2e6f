//! Structured logging setup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{ServerError, ServerResult};

/// Install a JSON `tracing` subscriber filtered by `RUST_LOG`.
///
/// Fails if a global subscriber is already set.
pub fn init_tracing() -> ServerResult<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("stockpile_server=debug,stockpile_cache=debug,tower_http=debug,info")
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().json())
        .try_init()
        .map_err(|e| ServerError::internal(format!("Failed to init subscriber: {}", e)))?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "tracing initialized");
    Ok(())
}
