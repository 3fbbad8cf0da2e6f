//! Dynamic partition registry.
//!
//! The aggregate UI state is a map from partition name to that partition's
//! state. Partitions are attached and detached at runtime: a feature adds
//! its reducer when it mounts and removes it when it unmounts. Dispatch
//! folds an action through whatever reducers are registered at that moment
//! and drops the state of partitions that are gone.
//!
//! ```text
//! absent --add--> registered --remove--> absent
//!          (add again: no-op)   (remove again: no-op)
//! ```
//!
//! There is no process-wide registry. Callers own a [`PartitionRegistry`]
//! (or a [`Store`] wrapping one) and pass it where dispatch happens.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::lock;

/// Type-erased state of one partition.
pub type PartitionState = Box<dyn Any + Send + Sync>;

/// State transition function of one partition.
pub trait Reducer<A>: Send + Sync {
    /// State of a freshly registered partition.
    fn initial_state(&self) -> PartitionState;

    /// Compute the next state for `action`.
    fn reduce(&self, state: PartitionState, action: &A) -> PartitionState;
}

/// [`Reducer`] built from an initial value and a pure function.
pub struct FnReducer<S, F> {
    initial: S,
    update: F,
}

/// Build a reducer from an initial state and a transition function.
pub fn reducer<S, A, F>(initial: S, update: F) -> FnReducer<S, F>
where
    F: Fn(S, &A) -> S,
{
    FnReducer { initial, update }
}

impl<S, A, F> Reducer<A> for FnReducer<S, F>
where
    S: Clone + Send + Sync + 'static,
    F: Fn(S, &A) -> S + Send + Sync,
{
    fn initial_state(&self) -> PartitionState {
        Box::new(self.initial.clone())
    }

    fn reduce(&self, state: PartitionState, action: &A) -> PartitionState {
        let current = match state.downcast::<S>() {
            Ok(state) => *state,
            Err(_) => {
                warn!("partition state had an unexpected type, reinitializing");
                self.initial.clone()
            }
        };
        Box::new((self.update)(current, action))
    }
}

// ============================================================================
// AGGREGATE STATE
// ============================================================================

/// The combined state of every registered partition.
#[derive(Default)]
pub struct AggregateState {
    partitions: BTreeMap<String, PartitionState>,
}

impl AggregateState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Typed view of a partition's state.
    pub fn get<S: 'static>(&self, name: &str) -> Option<&S> {
        self.partitions.get(name)?.downcast_ref::<S>()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.partitions.contains_key(name)
    }

    /// Partition names, sorted.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.partitions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }
}

impl fmt::Debug for AggregateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.partitions.keys()).finish()
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

/// Runtime-mutable map from partition name to reducer.
pub struct PartitionRegistry<A> {
    reducers: BTreeMap<String, Box<dyn Reducer<A>>>,
}

impl<A> Default for PartitionRegistry<A> {
    fn default() -> Self {
        Self {
            reducers: BTreeMap::new(),
        }
    }
}

impl<A> PartitionRegistry<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `reducer` under `name`.
    ///
    /// Returns `false` and leaves the registry untouched if the name is
    /// already registered or empty.
    pub fn add(&mut self, name: impl Into<String>, reducer: impl Reducer<A> + 'static) -> bool {
        let name = name.into();
        if name.is_empty() || self.reducers.contains_key(&name) {
            return false;
        }
        debug!(partition = %name, "partition added");
        self.reducers.insert(name, Box::new(reducer));
        true
    }

    /// Unregister `name`. Returns `false` if it was not registered.
    pub fn remove(&mut self, name: &str) -> bool {
        let removed = self.reducers.remove(name).is_some();
        if removed {
            debug!(partition = name, "partition removed");
        }
        removed
    }

    pub fn contains(&self, name: &str) -> bool {
        self.reducers.contains_key(name)
    }

    /// Registered partition names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.reducers.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.reducers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reducers.is_empty()
    }

    /// Initial state of every registered partition.
    pub fn initial_state(&self) -> AggregateState {
        self.reconcile(AggregateState::new())
    }

    /// Prune state of unregistered partitions and initialize missing ones.
    pub fn reconcile(&self, state: AggregateState) -> AggregateState {
        self.fold(state, |_, current| current)
    }

    /// Fold `action` through every registered reducer.
    ///
    /// State keys without a registered partition are dropped; registered
    /// partitions without state start from their initial state. The key set
    /// of the result is exactly [`names`](Self::names).
    pub fn dispatch(&self, state: AggregateState, action: &A) -> AggregateState {
        self.fold(state, |reducer, current| reducer.reduce(current, action))
    }

    fn fold(
        &self,
        state: AggregateState,
        step: impl Fn(&dyn Reducer<A>, PartitionState) -> PartitionState,
    ) -> AggregateState {
        let mut previous = state.partitions;
        let mut partitions = BTreeMap::new();
        for (name, reducer) in &self.reducers {
            let current = previous
                .remove(name)
                .unwrap_or_else(|| reducer.initial_state());
            partitions.insert(name.clone(), step(reducer.as_ref(), current));
        }
        if !previous.is_empty() {
            debug!(pruned = previous.len(), "dropped state of removed partitions");
        }
        AggregateState { partitions }
    }
}

impl<A> fmt::Debug for PartitionRegistry<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartitionRegistry")
            .field("partitions", &self.reducers.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ============================================================================
// STORE
// ============================================================================

struct StoreInner<A> {
    registry: PartitionRegistry<A>,
    state: AggregateState,
}

/// A registry and its aggregate state behind one lock.
///
/// Dispatches are serialized, and adding or removing a partition reconciles
/// the state immediately, so readers never see a key without a registered
/// partition. Cloning yields a handle to the same store.
pub struct Store<A> {
    inner: Arc<Mutex<StoreInner<A>>>,
}

impl<A> Clone for Store<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A> Default for Store<A> {
    fn default() -> Self {
        Self::new(PartitionRegistry::new())
    }
}

impl<A> Store<A> {
    pub fn new(registry: PartitionRegistry<A>) -> Self {
        let state = registry.initial_state();
        Self {
            inner: Arc::new(Mutex::new(StoreInner { registry, state })),
        }
    }

    pub fn dispatch(&self, action: &A) {
        let mut inner = lock(&self.inner);
        let state = std::mem::take(&mut inner.state);
        inner.state = inner.registry.dispatch(state, action);
    }

    /// Register a partition. See [`PartitionRegistry::add`].
    pub fn add(&self, name: impl Into<String>, reducer: impl Reducer<A> + 'static) -> bool {
        let mut inner = lock(&self.inner);
        let added = inner.registry.add(name, reducer);
        if added {
            let state = std::mem::take(&mut inner.state);
            inner.state = inner.registry.reconcile(state);
        }
        added
    }

    /// Unregister a partition and drop its state.
    pub fn remove(&self, name: &str) -> bool {
        let mut inner = lock(&self.inner);
        let removed = inner.registry.remove(name);
        if removed {
            let state = std::mem::take(&mut inner.state);
            inner.state = inner.registry.reconcile(state);
        }
        removed
    }

    /// Attach a partition for the lifetime of the returned guard.
    ///
    /// If `name` is already registered the guard does not own it and
    /// dropping the guard leaves it in place.
    pub fn inject(
        &self,
        name: impl Into<String>,
        reducer: impl Reducer<A> + 'static,
    ) -> PartitionGuard<A> {
        let name = name.into();
        let owned = self.add(name.clone(), reducer);
        PartitionGuard {
            store: self.clone(),
            name,
            owned,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        lock(&self.inner).registry.contains(name)
    }

    pub fn partition_names(&self) -> Vec<String> {
        lock(&self.inner).registry.names()
    }

    /// Read the aggregate state.
    pub fn with_state<T>(&self, read: impl FnOnce(&AggregateState) -> T) -> T {
        read(&lock(&self.inner).state)
    }

    /// Clone out one partition's state.
    pub fn select<S: Clone + 'static>(&self, name: &str) -> Option<S> {
        self.with_state(|state| state.get::<S>(name).cloned())
    }
}

/// Keeps a partition registered until dropped.
pub struct PartitionGuard<A> {
    store: Store<A>,
    name: String,
    owned: bool,
}

impl<A> PartitionGuard<A> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this guard registered the partition and will remove it.
    pub fn is_owner(&self) -> bool {
        self.owned
    }
}

impl<A> Drop for PartitionGuard<A> {
    fn drop(&mut self) {
        if self.owned {
            self.store.remove(&self.name);
        }
    }
}
