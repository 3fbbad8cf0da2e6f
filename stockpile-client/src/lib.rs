//! Stockpile Client - HTTP Adapter and Resource Views
//!
//! Wires the query cache and mutation engine to a REST backend and keeps
//! per-view UI state in a dynamic partition store.

pub mod client;
pub mod config;
pub mod error;
pub mod nav;
pub mod transport;
pub mod ui;

pub use client::{InventoryClient, ListView, ResourceClient, DEFAULT_PER_PAGE};
pub use config::{CacheSettings, ClientConfig, ConfigError};
pub use error::{error_message, ClientError, ClientResult, GENERIC_ERROR_MESSAGE};
pub use nav::PageInfo;
pub use transport::RestTransport;
pub use ui::{
    app_reducer, resource_ui_reducer, ui_partition, ui_store, AppState, ResourceUiState,
    UiAction, APP_PARTITION,
};
