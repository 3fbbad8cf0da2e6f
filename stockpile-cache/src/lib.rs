//! Stockpile Cache - Query Cache, Optimistic Mutation, Partition Registry
//!
//! Client-side state for the inventory manager.
//!
//! # Design Philosophy
//!
//! Reads are memoized per [`Fingerprint`]: every subscriber to the same
//! `(endpoint, args)` shares one cache entry and at most one in-flight fetch.
//! Writes may publish speculative patches into cached pages before the
//! backend answers. Every patch returns a value object describing its own
//! inverse, so a failed mutation rolls back exactly what it wrote and nothing
//! else.
//!
//! UI state lives in a [`Store`] whose partitions are attached and detached
//! at runtime through an explicit [`PartitionRegistry`].
//!
//! # Example
//!
//! ```ignore
//! let cache = QueryCache::<Record>::new(transport, CacheConfig::default());
//! let mut page = cache.subscribe(&Resource::Items.list_endpoint(), &ListQuery::page(1))?;
//! let entry = page.settled().await;
//!
//! let engine = MutationEngine::new(cache.clone());
//! let created = engine.create(Resource::Items, RecordDraft::new("Widget", 9.99)).await?;
//! ```
//!
//! [`Fingerprint`]: stockpile_core::Fingerprint

use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod entry;
pub mod mutation;
pub mod patch;
pub mod query;
pub mod registry;
pub mod traits;

pub use entry::{CacheEntry, QueryStatus};
pub use mutation::{MutationEngine, TempIdGenerator};
pub use patch::{ListOp, PatchSet, PendingPatch};
pub use query::{CacheConfig, QueryCache, Subscription};
pub use registry::{
    reducer, AggregateState, FnReducer, PartitionGuard, PartitionRegistry, PartitionState,
    Reducer, Store,
};
pub use traits::{CacheStats, CacheableRecord};

/// Lock a mutex, recovering the data if a previous holder panicked.
///
/// Every critical section in this crate leaves the guarded data consistent
/// before it can panic, so the poisoned value is still valid.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
