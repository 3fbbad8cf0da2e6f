//! Cacheable record marker and cache statistics.

use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;
use stockpile_core::{Record, RecordChanges, RecordDraft, RecordId, Timestamp};

/// Marker trait for records that can live in cached list pages.
///
/// The mutation engine needs three things from a record type: its
/// identity, how to build an optimistic placeholder from a create payload,
/// and how to shallow-merge an update payload.
///
/// # Implementation Requirements
///
/// - `record_id()` must be stable for the lifetime of a record
/// - `optimistic()` must use the supplied id verbatim
/// - `merge()` must only touch the fields present in `changes`
/// - `restore()` must only touch fields that still hold the written value
pub trait CacheableRecord:
    Clone + PartialEq + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Create payload.
    type Draft: Serialize + Clone + Debug + Send + Sync + 'static;
    /// Update payload.
    type Changes: Serialize + Clone + Debug + PartialEq + Send + Sync + 'static;

    fn record_id(&self) -> RecordId;

    /// Build a placeholder carrying a temporary id.
    fn optimistic(temp_id: RecordId, draft: &Self::Draft, created_at: Timestamp) -> Self;

    /// Id of the record targeted by `changes`.
    fn changes_target(changes: &Self::Changes) -> RecordId;

    /// Shallow-merge `changes` into this record.
    fn merge(&mut self, changes: &Self::Changes);

    /// Current values of the fields present in `changes`.
    fn prior(&self, changes: &Self::Changes) -> Self::Changes;

    /// Put back each field of `prior` whose value is still the one `written`
    /// set. Returns the values that were overwritten, or `None` when every
    /// field has since been changed by someone else.
    fn restore(&mut self, written: &Self::Changes, prior: &Self::Changes) -> Option<Self::Changes>;
}

impl CacheableRecord for Record {
    type Draft = RecordDraft;
    type Changes = RecordChanges;

    fn record_id(&self) -> RecordId {
        self.id
    }

    fn optimistic(temp_id: RecordId, draft: &RecordDraft, created_at: Timestamp) -> Self {
        Record {
            id: temp_id,
            name: draft.name.clone(),
            price: draft.price,
            created_at: Some(created_at),
        }
    }

    fn changes_target(changes: &RecordChanges) -> RecordId {
        changes.id
    }

    fn merge(&mut self, changes: &RecordChanges) {
        changes.apply_to(self);
    }

    fn prior(&self, changes: &RecordChanges) -> RecordChanges {
        RecordChanges {
            id: self.id,
            name: changes.name.as_ref().map(|_| self.name.clone()),
            price: changes.price.map(|_| self.price),
        }
    }

    fn restore(&mut self, written: &RecordChanges, prior: &RecordChanges) -> Option<RecordChanges> {
        let mut overwritten = RecordChanges::new(self.id);
        if let (Some(written), Some(prior)) = (&written.name, &prior.name) {
            if self.name == *written {
                overwritten.name = Some(std::mem::replace(&mut self.name, prior.clone()));
            }
        }
        if let (Some(written), Some(prior)) = (written.price, prior.price) {
            if self.price == written {
                overwritten.price = Some(std::mem::replace(&mut self.price, prior));
            }
        }
        (!overwritten.is_empty()).then_some(overwritten)
    }
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Subscriptions served by an existing entry.
    pub hits: u64,
    /// Subscriptions that created an entry.
    pub misses: u64,
    /// Transport calls issued for reads.
    pub fetches: u64,
    /// Entries removed after their idle period.
    pub evictions: u64,
    /// Number of entries currently in cache.
    pub entry_count: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
