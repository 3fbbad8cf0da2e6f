//! Query cache keyed by request fingerprint.
//!
//! The cache owns one slot per fingerprint. A slot holds the public
//! [`CacheEntry`] plus the bookkeeping needed for single-flight fetching,
//! stale tracking and idle eviction. All slot state lives behind one
//! mutex that is never held across an `.await`: a fetch is started under
//! the lock, runs unlocked on a spawned task, and settles under the lock
//! again.
//!
//! # Lifecycle
//!
//! ```text
//! subscribe (miss) -> Loading --ok--> Success --invalidate--> Fetching -> ...
//!                             \-err-> Error
//! last unsubscribe -> keep_unused_for elapses -> evicted
//! ```

use serde::Serialize;
use serde_json::Value;
use std::collections::{btree_map, BTreeMap};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use stockpile_core::{
    ApiError, Fingerprint, ListPage, QueryEndpoint, RequestDescriptor, StockpileResult, Tag,
    Transport,
};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::entry::{CacheEntry, QueryStatus};
use crate::lock;
use crate::patch::{ListOp, PatchSet, PendingPatch};
use crate::traits::{CacheStats, CacheableRecord};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Configuration for the query cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long an entry without subscribers is kept before eviction.
    pub keep_unused_for: Duration,
    /// Age after which a new subscription triggers a background refetch.
    /// `None` means entries only refetch when stale.
    pub refetch_after: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            keep_unused_for: Duration::from_secs(60),
            refetch_after: None,
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the idle period before eviction.
    pub fn with_keep_unused_for(mut self, duration: Duration) -> Self {
        self.keep_unused_for = duration;
        self
    }

    /// Refetch entries older than `age` when subscribed to.
    pub fn with_refetch_after(mut self, age: Duration) -> Self {
        self.refetch_after = Some(age);
        self
    }
}

// ============================================================================
// SLOTS
// ============================================================================

struct Slot<R> {
    entry: CacheEntry<R>,
    path: &'static str,
    /// Set by invalidation; cleared when a fetch starts.
    stale: bool,
    /// Status to restore if the running fetch is discarded.
    prior_status: QueryStatus,
    fetched_at: Option<Instant>,
    /// Bumped on every subscribe and release so outdated eviction timers
    /// can recognize themselves.
    release_epoch: u64,
    notify: watch::Sender<u64>,
}

impl<R> Slot<R> {
    fn new(entry: CacheEntry<R>, path: &'static str) -> Self {
        let (notify, _) = watch::channel(0);
        Self {
            entry,
            path,
            stale: false,
            prior_status: QueryStatus::Uninitialized,
            fetched_at: None,
            release_epoch: 0,
            notify,
        }
    }

    fn in_flight(&self) -> bool {
        self.entry.status.is_in_flight()
    }

    fn needs_fetch(&self, config: &CacheConfig) -> bool {
        if self.in_flight() {
            return false;
        }
        let expired = match (config.refetch_after, self.fetched_at) {
            (Some(max_age), Some(at)) => at.elapsed() >= max_age,
            _ => false,
        };
        self.stale
            || expired
            || matches!(
                self.entry.status,
                QueryStatus::Uninitialized | QueryStatus::Error
            )
    }

    /// Transition into a fetching state and build the request to send.
    fn begin_fetch(&mut self, stats: &mut CacheStats) -> RequestDescriptor {
        self.prior_status = self.entry.status;
        self.entry.status = if self.entry.value.is_some() {
            QueryStatus::Fetching
        } else {
            QueryStatus::Loading
        };
        self.stale = false;
        stats.fetches += 1;
        self.touch();
        RequestDescriptor::get(self.path).with_params(self.entry.args.clone())
    }

    fn touch(&self) {
        self.notify.send_modify(|version| *version = version.wrapping_add(1));
    }
}

struct CacheState<R> {
    slots: BTreeMap<Fingerprint, Slot<R>>,
    stats: CacheStats,
    next_patch_id: u64,
}

struct Inner<R> {
    transport: Arc<dyn Transport>,
    config: CacheConfig,
    state: Mutex<CacheState<R>>,
}

type FetchJob = (Fingerprint, RequestDescriptor);

// ============================================================================
// QUERY CACHE
// ============================================================================

/// Memoizing, deduplicating cache of list queries.
///
/// Cloning is cheap and yields a handle to the same cache.
///
/// Operations that may start a fetch (`subscribe`, `invalidate`, `refetch`)
/// spawn onto the current Tokio runtime and panic outside of one.
pub struct QueryCache<R: CacheableRecord> {
    inner: Arc<Inner<R>>,
}

impl<R: CacheableRecord> Clone for QueryCache<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: CacheableRecord> QueryCache<R> {
    /// Create a new cache that reads through `transport`.
    pub fn new(transport: Arc<dyn Transport>, config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                config,
                state: Mutex::new(CacheState {
                    slots: BTreeMap::new(),
                    stats: CacheStats::default(),
                    next_patch_id: 1,
                }),
            }),
        }
    }

    /// Create a new cache with default configuration.
    pub fn with_defaults(transport: Arc<dyn Transport>) -> Self {
        Self::new(transport, CacheConfig::default())
    }

    /// Get the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// The transport reads are issued through.
    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.inner.transport)
    }

    /// Subscribe to `(endpoint, args)`.
    ///
    /// Creates the entry and starts a fetch on a miss. On a hit the existing
    /// value is served and a background refetch starts if the entry is
    /// stale, errored or older than `refetch_after`.
    pub fn subscribe<A: Serialize + ?Sized>(
        &self,
        endpoint: &QueryEndpoint,
        args: &A,
    ) -> StockpileResult<Subscription<R>> {
        let normalized = endpoint.normalize(args)?;
        let fingerprint = Fingerprint::from_normalized(endpoint.name, &normalized);

        let (receiver, job) = {
            let mut state = lock(&self.inner.state);
            let CacheState { slots, stats, .. } = &mut *state;

            let slot = match slots.entry(fingerprint.clone()) {
                btree_map::Entry::Occupied(occupied) => {
                    stats.hits += 1;
                    occupied.into_mut()
                }
                btree_map::Entry::Vacant(vacant) => {
                    stats.misses += 1;
                    debug!(fingerprint = %fingerprint, "cache miss");
                    let entry = CacheEntry::new(
                        fingerprint.clone(),
                        endpoint.name,
                        endpoint.tag,
                        normalized,
                    );
                    vacant.insert(Slot::new(entry, endpoint.path))
                }
            };

            slot.entry.subscriber_count += 1;
            slot.release_epoch += 1;
            let job = slot
                .needs_fetch(&self.inner.config)
                .then(|| (fingerprint.clone(), slot.begin_fetch(stats)));
            slot.touch();
            (slot.notify.subscribe(), job)
        };

        if let Some(job) = job {
            self.spawn_fetch(job);
        }

        Ok(Subscription {
            cache: self.clone(),
            fingerprint,
            receiver,
            active: true,
        })
    }

    /// Drop one subscriber of `fingerprint`. The last release schedules
    /// eviction after `keep_unused_for`.
    fn release(&self, fingerprint: &Fingerprint) {
        let mut state = lock(&self.inner.state);
        let Some(slot) = state.slots.get_mut(fingerprint) else {
            return;
        };
        slot.entry.subscriber_count = slot.entry.subscriber_count.saturating_sub(1);
        slot.touch();
        if slot.entry.subscriber_count > 0 {
            return;
        }

        slot.release_epoch += 1;
        let epoch = slot.release_epoch;
        let keep_for = self.inner.config.keep_unused_for;
        let handle = tokio::runtime::Handle::try_current();

        match handle {
            Ok(handle) if !keep_for.is_zero() => {
                let weak: Weak<Inner<R>> = Arc::downgrade(&self.inner);
                let fingerprint = fingerprint.clone();
                handle.spawn(async move {
                    tokio::time::sleep(keep_for).await;
                    if let Some(inner) = weak.upgrade() {
                        inner.evict_if_idle(&fingerprint, epoch);
                    }
                });
            }
            _ => {
                drop(state);
                self.inner.evict_if_idle(fingerprint, epoch);
            }
        }
    }

    /// Mark every entry providing `tag` stale.
    ///
    /// Entries with subscribers refetch immediately, or once their current
    /// fetch lands. Returns the number of entries affected.
    pub fn invalidate(&self, tag: Tag) -> usize {
        debug!(tag = %tag, "invalidating tag");
        self.invalidate_where(|entry| entry.tag == tag)
    }

    /// Mark every entry of `endpoint_name` stale.
    pub fn invalidate_endpoint(&self, endpoint_name: &str) -> usize {
        debug!(endpoint = endpoint_name, "invalidating endpoint");
        self.invalidate_where(|entry| entry.endpoint == endpoint_name)
    }

    fn invalidate_where(&self, matches: impl Fn(&CacheEntry<R>) -> bool) -> usize {
        let mut affected = 0;
        let mut jobs: Vec<FetchJob> = Vec::new();
        {
            let mut state = lock(&self.inner.state);
            let CacheState { slots, stats, .. } = &mut *state;
            for (fingerprint, slot) in slots.iter_mut() {
                if !matches(&slot.entry) {
                    continue;
                }
                affected += 1;
                if slot.in_flight() || slot.entry.subscriber_count == 0 {
                    slot.stale = true;
                } else {
                    jobs.push((fingerprint.clone(), slot.begin_fetch(stats)));
                }
            }
        }
        for job in jobs {
            self.spawn_fetch(job);
        }
        affected
    }

    /// Force a refetch of `fingerprint`. Returns `false` if it is not cached.
    pub fn refetch(&self, fingerprint: &Fingerprint) -> bool {
        let job = {
            let mut state = lock(&self.inner.state);
            let CacheState { slots, stats, .. } = &mut *state;
            let Some(slot) = slots.get_mut(fingerprint) else {
                return false;
            };
            if slot.in_flight() {
                slot.stale = true;
                None
            } else {
                Some((fingerprint.clone(), slot.begin_fetch(stats)))
            }
        };
        if let Some(job) = job {
            self.spawn_fetch(job);
        }
        true
    }

    /// Every normalized argument set currently cached for `endpoint_name`.
    pub fn cached_args_for(&self, endpoint_name: &str) -> Vec<Value> {
        let state = lock(&self.inner.state);
        state
            .slots
            .values()
            .filter(|slot| slot.entry.endpoint == endpoint_name)
            .map(|slot| slot.entry.args.clone())
            .collect()
    }

    /// Fingerprints currently cached for `endpoint_name`.
    pub fn cached_fingerprints_for(&self, endpoint_name: &str) -> Vec<Fingerprint> {
        let state = lock(&self.inner.state);
        state
            .slots
            .iter()
            .filter(|(_, slot)| slot.entry.endpoint == endpoint_name)
            .map(|(fingerprint, _)| fingerprint.clone())
            .collect()
    }

    /// Transform the cached page of `fingerprint` in place.
    ///
    /// The returned patch restores the page exactly. If the fingerprint is
    /// absent or holds no value the transform is not run and the patch is a
    /// no-op.
    pub fn update_entry(
        &self,
        fingerprint: &Fingerprint,
        transform: impl FnOnce(&mut ListPage<R>),
    ) -> PendingPatch<R> {
        self.patch_with(fingerprint, |page| {
            let snapshot = page.clone();
            transform(page);
            Some(ListOp::Replace(snapshot))
        })
    }

    /// Apply a record-level operation to the cached page of `fingerprint`.
    pub fn apply(&self, fingerprint: &Fingerprint, op: ListOp<R>) -> PendingPatch<R> {
        self.patch_with(fingerprint, |page| op.apply(page))
    }

    fn patch_with(
        &self,
        fingerprint: &Fingerprint,
        edit: impl FnOnce(&mut ListPage<R>) -> Option<ListOp<R>>,
    ) -> PendingPatch<R> {
        let mut state = lock(&self.inner.state);
        let patch_id = state.next_patch_id;
        state.next_patch_id += 1;

        let inverse = state.slots.get_mut(fingerprint).and_then(|slot| {
            let inverse = edit(slot.entry.value.as_mut()?);
            if inverse.is_some() {
                slot.touch();
            }
            inverse
        });

        PendingPatch {
            fingerprint: fingerprint.clone(),
            patch_id,
            inverse,
            applied_at: chrono::Utc::now(),
        }
    }

    /// Undo a patch. Returns `true` if its inverse was applied.
    pub fn undo(&self, patch: PendingPatch<R>) -> bool {
        let Some(inverse) = patch.inverse else {
            return false;
        };
        let mut state = lock(&self.inner.state);
        let Some(slot) = state.slots.get_mut(&patch.fingerprint) else {
            return false;
        };
        let Some(page) = slot.entry.value.as_mut() else {
            return false;
        };
        let applied = inverse.apply(page).is_some();
        if applied {
            slot.touch();
        }
        applied
    }

    /// Undo every patch of `patches`, newest first. Returns how many applied.
    pub fn rollback(&self, patches: PatchSet<R>) -> usize {
        patches
            .into_rollback_order()
            .map(|patch| self.undo(patch))
            .filter(|applied| *applied)
            .count()
    }

    /// Snapshot of the entry for `fingerprint`.
    pub fn entry(&self, fingerprint: &Fingerprint) -> Option<CacheEntry<R>> {
        let state = lock(&self.inner.state);
        state.slots.get(fingerprint).map(|slot| slot.entry.clone())
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        lock(&self.inner.state).slots.contains_key(fingerprint)
    }

    pub fn len(&self) -> usize {
        lock(&self.inner.state).slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Usage statistics.
    pub fn stats(&self) -> CacheStats {
        let state = lock(&self.inner.state);
        CacheStats {
            entry_count: state.slots.len() as u64,
            ..state.stats.clone()
        }
    }

    fn spawn_fetch(&self, (fingerprint, request): FetchJob) {
        debug!(fingerprint = %fingerprint, "starting fetch");
        tokio::spawn(run_fetch(Arc::clone(&self.inner), fingerprint, request));
    }
}

impl<R: CacheableRecord> Inner<R> {
    /// Store a fetch outcome. Returns the follow-up request when the entry
    /// was invalidated while the fetch was in flight.
    fn settle_fetch(
        &self,
        fingerprint: &Fingerprint,
        outcome: Result<ListPage<R>, ApiError>,
    ) -> Option<RequestDescriptor> {
        let mut state = lock(&self.state);
        let CacheState { slots, stats, .. } = &mut *state;
        let Some(slot) = slots.get_mut(fingerprint) else {
            debug!(fingerprint = %fingerprint, "fetch settled after eviction, discarding");
            return None;
        };

        if slot.entry.subscriber_count == 0 {
            debug!(fingerprint = %fingerprint, "no subscribers left, discarding fetch result");
            slot.entry.status = slot.prior_status;
            slot.stale = true;
            slot.touch();
            return None;
        }

        match outcome {
            Ok(page) => {
                slot.entry.value = Some(page);
                slot.entry.error = None;
                slot.entry.status = QueryStatus::Success;
                slot.entry.last_fetched_at = Some(chrono::Utc::now());
                slot.fetched_at = Some(Instant::now());
            }
            Err(error) => {
                warn!(fingerprint = %fingerprint, error = %error, "fetch failed");
                slot.entry.error = Some(error);
                slot.entry.status = QueryStatus::Error;
            }
        }

        let follow_up = slot.stale.then(|| slot.begin_fetch(stats));
        slot.touch();
        follow_up
    }

    fn evict_if_idle(&self, fingerprint: &Fingerprint, epoch: u64) {
        let mut state = lock(&self.state);
        let idle = state
            .slots
            .get(fingerprint)
            .is_some_and(|slot| slot.entry.subscriber_count == 0 && slot.release_epoch == epoch);
        if idle {
            state.slots.remove(fingerprint);
            state.stats.evictions += 1;
            debug!(fingerprint = %fingerprint, "evicted idle entry");
        }
    }
}

async fn run_fetch<R: CacheableRecord>(
    inner: Arc<Inner<R>>,
    fingerprint: Fingerprint,
    mut request: RequestDescriptor,
) {
    loop {
        let outcome = inner.transport.send(request).await.and_then(|body| {
            serde_json::from_value::<ListPage<R>>(body)
                .map_err(|e| ApiError::transport(format!("Malformed list response: {}", e)))
        });
        match inner.settle_fetch(&fingerprint, outcome) {
            Some(next) => request = next,
            None => break,
        }
    }
}

// ============================================================================
// SUBSCRIPTION
// ============================================================================

/// A live subscription to one cache entry.
///
/// Dropping the subscription unsubscribes.
pub struct Subscription<R: CacheableRecord> {
    cache: QueryCache<R>,
    fingerprint: Fingerprint,
    receiver: watch::Receiver<u64>,
    active: bool,
}

impl<R: CacheableRecord> Subscription<R> {
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Current state of the entry.
    pub fn snapshot(&self) -> Option<CacheEntry<R>> {
        self.cache.entry(&self.fingerprint)
    }

    /// Wait for the next change to the entry. Returns `false` if the entry
    /// is gone.
    pub async fn changed(&mut self) -> bool {
        self.receiver.changed().await.is_ok()
    }

    /// Wait until no fetch is in flight and return the entry.
    pub async fn settled(&mut self) -> Option<CacheEntry<R>> {
        loop {
            self.receiver.borrow_and_update();
            let entry = self.snapshot()?;
            if !entry.is_fetching() {
                return Some(entry);
            }
            if !self.changed().await {
                return self.snapshot();
            }
        }
    }

    /// Force a refetch of this entry.
    pub fn refetch(&self) -> bool {
        self.cache.refetch(&self.fingerprint)
    }

    /// Unsubscribe explicitly.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if std::mem::take(&mut self.active) {
            self.cache.release(&self.fingerprint);
        }
    }
}

impl<R: CacheableRecord> Drop for Subscription<R> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<R: CacheableRecord> std::fmt::Debug for Subscription<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("fingerprint", &self.fingerprint)
            .field("active", &self.active)
            .finish()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use stockpile_core::{ListQuery, Record, Resource};
    use stockpile_test_utils::{list_body, ScriptedTransport};

    fn cache(transport: &Arc<ScriptedTransport>) -> QueryCache<Record> {
        QueryCache::new(transport.clone(), CacheConfig::default())
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond_ok(list_body(&[Record::new(1, "a", 1.0)], 1, 5, 1));
        let cache = cache(&transport);
        let endpoint = Resource::Items.list_endpoint();

        let mut first = cache.subscribe(&endpoint, &ListQuery::new()).unwrap();
        let entry = first.settled().await.unwrap();
        assert_eq!(entry.status, QueryStatus::Success);
        assert_eq!(entry.records().len(), 1);

        let second = cache.subscribe(&endpoint, &ListQuery::page(1)).unwrap();
        assert_eq!(second.fingerprint(), first.fingerprint());
        assert_eq!(second.snapshot().unwrap().subscriber_count, 2);

        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.fetches), (1, 1, 1));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_error_keeps_previous_value() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond_ok(list_body(&[Record::new(1, "a", 1.0)], 1, 5, 1));
        transport.respond_err(ApiError::with_status(500, "boom"));
        let cache = cache(&transport);

        let mut sub = cache
            .subscribe(&Resource::Items.list_endpoint(), &ListQuery::new())
            .unwrap();
        sub.settled().await.unwrap();

        assert!(sub.refetch());
        let entry = sub.settled().await.unwrap();
        assert_eq!(entry.status, QueryStatus::Error);
        assert_eq!(entry.records().len(), 1);
        assert_eq!(entry.error.unwrap().status, Some(500));
    }

    #[tokio::test]
    async fn test_malformed_body_is_transport_error() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond_ok(serde_json::json!({"unexpected": true}));
        let cache = cache(&transport);

        let mut sub = cache
            .subscribe(&Resource::Items.list_endpoint(), &ListQuery::new())
            .unwrap();
        let entry = sub.settled().await.unwrap();
        assert!(entry.is_error());
        assert_eq!(entry.error.unwrap().status, None);
    }

    #[tokio::test]
    async fn test_update_entry_absent_is_noop() {
        let transport = Arc::new(ScriptedTransport::new());
        let cache = cache(&transport);
        let fp = Resource::Items
            .list_endpoint()
            .fingerprint(&ListQuery::page(9))
            .unwrap();

        let mut ran = false;
        let patch = cache.update_entry(&fp, |_| ran = true);
        assert!(patch.is_noop());
        assert!(!ran);
        assert!(!cache.undo(patch));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_update_entry_undo_restores_exactly() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond_ok(list_body(
            &[Record::new(2, "b", 2.0), Record::new(1, "a", 1.0)],
            2,
            5,
            1,
        ));
        let cache = cache(&transport);
        let mut sub = cache
            .subscribe(&Resource::Items.list_endpoint(), &ListQuery::new())
            .unwrap();
        let before = sub.settled().await.unwrap().value;

        let patch = cache.update_entry(sub.fingerprint(), |page| {
            page.data.retain(|r| r.id != 2);
            page.data[0].price = 100.0;
        });
        assert_eq!(sub.snapshot().unwrap().records().len(), 1);

        assert!(cache.undo(patch));
        assert_eq!(sub.snapshot().unwrap().value, before);
    }

    #[tokio::test]
    async fn test_cached_args_reflect_current_map() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond_ok(list_body(&[], 0, 5, 1));
        transport.respond_ok(list_body(&[], 0, 5, 2));
        let cache = cache(&transport);
        let endpoint = Resource::Items.list_endpoint();

        let _p1 = cache.subscribe(&endpoint, &ListQuery::page(1)).unwrap();
        let _p2 = cache.subscribe(&endpoint, &ListQuery::page(2)).unwrap();

        let mut pages: Vec<u64> = cache
            .cached_args_for("getItems")
            .iter()
            .filter_map(|args| args["page"].as_u64())
            .collect();
        pages.sort();
        assert_eq!(pages, vec![1, 2]);
        assert!(cache.cached_args_for("getProducts").is_empty());
    }

    #[tokio::test]
    async fn test_zero_keep_unused_evicts_on_release() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond_ok(list_body(&[], 0, 5, 1));
        let cache: QueryCache<Record> = QueryCache::new(
            transport.clone(),
            CacheConfig::new().with_keep_unused_for(Duration::ZERO),
        );

        let mut sub = cache
            .subscribe(&Resource::Items.list_endpoint(), &ListQuery::new())
            .unwrap();
        sub.settled().await.unwrap();
        let fp = sub.fingerprint().clone();
        sub.unsubscribe();

        assert!(!cache.contains(&fp));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_config_builder() {
        let config = CacheConfig::new()
            .with_keep_unused_for(Duration::from_secs(5))
            .with_refetch_after(Duration::from_secs(30));
        assert_eq!(config.keep_unused_for, Duration::from_secs(5));
        assert_eq!(config.refetch_after, Some(Duration::from_secs(30)));
        assert_eq!(CacheConfig::default().keep_unused_for, Duration::from_secs(60));
    }
}
