//! Cache entries and their lifecycle status.

use serde_json::Value;
use stockpile_core::{ApiError, Fingerprint, ListPage, Tag, Timestamp};

/// Lifecycle of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryStatus {
    /// Created but never fetched, or its only fetch was discarded.
    Uninitialized,
    /// First fetch in flight, no value yet.
    Loading,
    /// Refetch in flight while the previous value is served.
    Fetching,
    /// Last fetch succeeded.
    Success,
    /// Last fetch failed. A previous value, if any, is kept.
    Error,
}

impl QueryStatus {
    /// Whether a fetch is in flight.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, QueryStatus::Loading | QueryStatus::Fetching)
    }
}

/// Snapshot of a cache entry.
///
/// Entries are owned by the [`QueryCache`](crate::QueryCache); callers only
/// ever see clones.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<R> {
    pub fingerprint: Fingerprint,
    pub endpoint: &'static str,
    pub tag: Tag,
    /// Normalized arguments the entry was created for.
    pub args: Value,
    pub status: QueryStatus,
    pub value: Option<ListPage<R>>,
    pub error: Option<ApiError>,
    pub subscriber_count: usize,
    pub last_fetched_at: Option<Timestamp>,
}

impl<R> CacheEntry<R> {
    pub(crate) fn new(fingerprint: Fingerprint, endpoint: &'static str, tag: Tag, args: Value) -> Self {
        Self {
            fingerprint,
            endpoint,
            tag,
            args,
            status: QueryStatus::Uninitialized,
            value: None,
            error: None,
            subscriber_count: 0,
            last_fetched_at: None,
        }
    }

    /// First load, nothing to show yet.
    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    /// Any fetch in flight, including the first one.
    pub fn is_fetching(&self) -> bool {
        self.status.is_in_flight()
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }

    /// Records of the cached page, empty when nothing is cached.
    pub fn records(&self) -> &[R] {
        self.value.as_ref().map(|page| page.data.as_slice()).unwrap_or(&[])
    }
}
