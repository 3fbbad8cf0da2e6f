//! In-process transport over the backend store.
//!
//! Routes request descriptors straight to [`InventoryStore`] without a
//! socket, producing exactly the bodies and errors the HTTP routes would.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use stockpile_core::{Envelope, Method, RequestDescriptor, Transport, TransportResult};
use tracing::debug;

use crate::error::{ServerError, ServerResult};
use crate::routes::{resource, ListParams};
use crate::store::InventoryStore;

/// [`Transport`] that serves requests from an in-memory store.
#[derive(Debug, Clone, Default)]
pub struct InProcessTransport {
    store: InventoryStore,
    latency: Option<Duration>,
}

impl InProcessTransport {
    pub fn new(store: InventoryStore) -> Self {
        Self {
            store,
            latency: None,
        }
    }

    /// Delay every response by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn store(&self) -> &InventoryStore {
        &self.store
    }

    async fn route(&self, request: &RequestDescriptor) -> ServerResult<Value> {
        let path = request.url.split('?').next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let body = request.data.clone().unwrap_or(Value::Null);

        match (request.method, segments.as_slice()) {
            (Method::Get, [collection]) => {
                let pairs = request.query_pairs();
                let query = ListParams::from_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
                    .into_query()?;
                let page = self.store.list(resource(collection)?, &query).await?;
                to_body(&page)
            }
            (Method::Post, [collection]) => {
                let record = self.store.create(resource(collection)?, &body).await?;
                to_body(&Envelope::success(record))
            }
            (Method::Put, [collection, id]) => {
                let record = self.store.update(resource(collection)?, id, &body).await?;
                to_body(&Envelope::success(record))
            }
            (Method::Patch, [collection, id]) => {
                let record = self.store.patch(resource(collection)?, id, &body).await?;
                to_body(&Envelope::success(record))
            }
            (Method::Delete, [collection, id]) => {
                let record = self.store.delete(resource(collection)?, id).await?;
                to_body(&Envelope::success(record))
            }
            _ => Err(ServerError::not_found("Not found")),
        }
    }
}

fn to_body<T: Serialize>(value: &T) -> ServerResult<Value> {
    serde_json::to_value(value)
        .map_err(|e| ServerError::internal(format!("Failed to encode response: {}", e)))
}

#[async_trait]
impl Transport for InProcessTransport {
    async fn send(&self, request: RequestDescriptor) -> TransportResult {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let result = self.route(&request).await;
        debug!(
            method = %request.method,
            url = %request.url,
            ok = result.is_ok(),
            "in-process request"
        );
        result.map_err(|e| e.to_api_error())
    }
}
