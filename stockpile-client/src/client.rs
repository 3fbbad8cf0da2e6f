//! Resource facade over the cache, the mutation engine and the UI store.
//!
//! [`InventoryClient`] owns one cache and one store. Mounting a resource
//! injects its UI partition; every list load and mutation keeps that
//! partition's loading flag and inline message current.

use std::sync::Arc;
use stockpile_cache::{
    CacheConfig, CacheEntry, MutationEngine, PartitionGuard, QueryCache, Store, Subscription,
};
use stockpile_core::{
    ListQuery, MutationError, Record, RecordChanges, RecordDraft, RecordId, Resource,
    Transport,
};
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{error_message, ClientResult};
use crate::nav::PageInfo;
use crate::transport::RestTransport;
use crate::ui::{resource_ui_reducer, ui_partition, ui_store, ResourceUiState, UiAction};

pub const DEFAULT_PER_PAGE: u32 = 5;

/// Entry point for the item and product views.
#[derive(Clone)]
pub struct InventoryClient {
    engine: MutationEngine<Record>,
    store: Store<UiAction>,
    per_page: u32,
}

impl InventoryClient {
    pub fn new(transport: Arc<dyn Transport>, config: CacheConfig) -> Self {
        let cache = QueryCache::new(transport, config);
        Self {
            engine: MutationEngine::new(cache),
            store: ui_store(),
            per_page: DEFAULT_PER_PAGE,
        }
    }

    /// Build a client talking HTTP to the configured backend.
    pub fn from_config(config: &ClientConfig) -> ClientResult<Self> {
        let transport = RestTransport::new(config)?;
        Ok(Self::new(Arc::new(transport), config.cache_config()).with_per_page(config.per_page))
    }

    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page.max(1);
        self
    }

    pub fn cache(&self) -> &QueryCache<Record> {
        self.engine.cache()
    }

    pub fn engine(&self) -> &MutationEngine<Record> {
        &self.engine
    }

    pub fn store(&self) -> &Store<UiAction> {
        &self.store
    }

    /// Mount the view for `resource`, registering its UI partition until
    /// the returned client is dropped.
    pub fn mount(&self, resource: Resource) -> ResourceClient {
        let partition = self
            .store
            .inject(ui_partition(resource), resource_ui_reducer(resource));
        ResourceClient {
            resource,
            engine: self.engine.clone(),
            store: self.store.clone(),
            per_page: self.per_page,
            _partition: partition,
        }
    }
}

impl std::fmt::Debug for InventoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InventoryClient")
            .field("per_page", &self.per_page)
            .field("partitions", &self.store.partition_names())
            .finish()
    }
}

/// One rendered page of a list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListView {
    /// Records in cache order.
    pub records: Vec<Record>,
    pub page_info: Option<PageInfo>,
    pub error: Option<String>,
}

impl ListView {
    pub fn from_entry(entry: &CacheEntry<Record>) -> Self {
        Self {
            records: entry.records().to_vec(),
            page_info: entry
                .value
                .as_ref()
                .and_then(|page| page.pagination())
                .map(PageInfo::from),
            error: entry.error.as_ref().map(error_message),
        }
    }
}

/// Client for a mounted resource view.
pub struct ResourceClient {
    resource: Resource,
    engine: MutationEngine<Record>,
    store: Store<UiAction>,
    per_page: u32,
    _partition: PartitionGuard<UiAction>,
}

impl ResourceClient {
    pub fn resource(&self) -> Resource {
        self.resource
    }

    pub fn query(&self, page: u32) -> ListQuery {
        ListQuery::page(page)
            .with_status("ok")
            .with_per_page(self.per_page)
    }

    /// Subscribe to one page of the list.
    pub fn subscribe(&self, page: u32) -> ClientResult<Subscription<Record>> {
        let subscription = self
            .engine
            .cache()
            .subscribe(&self.resource.list_endpoint(), &self.query(page))?;
        Ok(subscription)
    }

    /// Load one page and wait for it to settle.
    pub async fn load(&self, page: u32) -> ClientResult<ListView> {
        let mut subscription = self.subscribe(page)?;
        self.set_loading(true);
        let entry = subscription.settled().await;
        self.set_loading(false);

        let view = entry.as_ref().map(ListView::from_entry).unwrap_or_default();
        debug!(
            resource = %self.resource,
            page,
            records = view.records.len(),
            failed = view.error.is_some(),
            "page loaded"
        );
        Ok(view)
    }

    pub async fn create(&self, name: impl Into<String>, price: f64) -> Result<Record, MutationError> {
        let draft = RecordDraft::new(name.into().trim(), price);
        self.track(self.engine.create(self.resource, draft)).await
    }

    /// Replace name and price of record `id`.
    pub async fn update(
        &self,
        id: RecordId,
        name: impl Into<String>,
        price: f64,
    ) -> Result<Record, MutationError> {
        let changes = RecordChanges::full(id, name.into().trim(), price);
        self.track(self.engine.update(self.resource, changes)).await
    }

    /// Change only the supplied fields.
    pub async fn patch(&self, changes: RecordChanges) -> Result<Record, MutationError> {
        self.track(self.engine.patch(self.resource, changes)).await
    }

    pub async fn delete(&self, id: RecordId) -> Result<Record, MutationError> {
        self.track(self.engine.delete(self.resource, id)).await
    }

    /// Current state of this view's UI partition.
    pub fn ui_state(&self) -> ResourceUiState {
        self.store
            .select::<ResourceUiState>(ui_partition(self.resource))
            .unwrap_or_default()
    }

    async fn track(
        &self,
        mutation: impl std::future::Future<Output = Result<Record, MutationError>>,
    ) -> Result<Record, MutationError> {
        self.set_loading(true);
        let result = mutation.await;
        self.set_loading(false);
        self.set_message(result.as_ref().err().map(|e| error_message(e.api_error())));
        result
    }

    fn set_loading(&self, loading: bool) {
        self.store.dispatch(&UiAction::SetLoading {
            resource: self.resource,
            loading,
        });
    }

    fn set_message(&self, message: Option<String>) {
        self.store.dispatch(&UiAction::SetMessage {
            resource: self.resource,
            message,
        });
    }
}

impl std::fmt::Debug for ResourceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceClient")
            .field("resource", &self.resource)
            .field("per_page", &self.per_page)
            .finish()
    }
}
