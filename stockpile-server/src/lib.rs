//! Stockpile Server - Mock Inventory Backend
//!
//! Serves the `items` and `products` collections with the paginated
//! envelope format the cache expects. The same store backs both the axum
//! router and [`InProcessTransport`], so tests and demos can run the whole
//! stack without binding a port.

pub mod config;
pub mod error;
pub mod routes;
pub mod store;
pub mod telemetry;
pub mod transport;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use routes::{router, ListParams};
pub use store::{sort_newest_first, InventoryStore, Seed};
pub use telemetry::init_tracing;
pub use transport::InProcessTransport;
