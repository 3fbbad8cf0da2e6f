//! Record-level patch operations and their inverses.
//!
//! Every [`ListOp`] applied to a cached page yields the operation that
//! reverts it. The inverse is a plain value, so a mutation can hold on to
//! it across an await point and replay it later without borrowing the
//! cache.

use stockpile_core::{Fingerprint, ListPage, RecordId, Timestamp};

use crate::traits::CacheableRecord;

/// A structural edit of one cached list page.
#[derive(Debug, Clone, PartialEq)]
pub enum ListOp<R: CacheableRecord> {
    /// Insert a record at the front of the page.
    Prepend(R),
    /// Insert a record at `index`, clamped to the page length.
    InsertAt { index: usize, record: R },
    /// Remove the first record with `id`.
    RemoveById(RecordId),
    /// Replace the record with `id` by `record`. The ids may differ.
    ReplaceById { id: RecordId, record: R },
    /// Shallow-merge `changes` into the record with `id`.
    MergeById { id: RecordId, changes: R::Changes },
    /// Reset the fields of `prior` that still hold the `written` value.
    RestoreFields {
        id: RecordId,
        written: R::Changes,
        prior: R::Changes,
    },
    /// Swap the whole page.
    Replace(ListPage<R>),
}

impl<R: CacheableRecord> ListOp<R> {
    /// Apply to `page`, returning the inverse operation.
    ///
    /// Returns `None` when the operation did not change anything, e.g. the
    /// targeted record is not on this page.
    pub fn apply(self, page: &mut ListPage<R>) -> Option<ListOp<R>> {
        match self {
            ListOp::Prepend(record) => {
                let id = record.record_id();
                page.data.insert(0, record);
                Some(ListOp::RemoveById(id))
            }
            ListOp::InsertAt { index, record } => {
                let id = record.record_id();
                let index = index.min(page.data.len());
                page.data.insert(index, record);
                Some(ListOp::RemoveById(id))
            }
            ListOp::RemoveById(id) => {
                let index = position(page, id)?;
                let record = page.data.remove(index);
                Some(ListOp::InsertAt { index, record })
            }
            ListOp::ReplaceById { id, record } => {
                let index = position(page, id)?;
                let new_id = record.record_id();
                let previous = std::mem::replace(&mut page.data[index], record);
                Some(ListOp::ReplaceById {
                    id: new_id,
                    record: previous,
                })
            }
            ListOp::MergeById { id, changes } => {
                let index = position(page, id)?;
                let record = &mut page.data[index];
                let prior = record.prior(&changes);
                record.merge(&changes);
                Some(ListOp::RestoreFields {
                    id,
                    written: changes,
                    prior,
                })
            }
            ListOp::RestoreFields { id, written, prior } => {
                let index = position(page, id)?;
                let record = &mut page.data[index];
                let overwritten = record.restore(&written, &prior)?;
                Some(ListOp::MergeById {
                    id,
                    changes: overwritten,
                })
            }
            ListOp::Replace(next) => {
                let previous = std::mem::replace(page, next);
                Some(ListOp::Replace(previous))
            }
        }
    }
}

fn position<R: CacheableRecord>(page: &ListPage<R>, id: RecordId) -> Option<usize> {
    page.data.iter().position(|r| r.record_id() == id)
}

/// An applied patch awaiting settlement of its mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingPatch<R: CacheableRecord> {
    pub fingerprint: Fingerprint,
    /// Unique per cache, increasing in application order.
    pub patch_id: u64,
    /// Operation restoring the page; `None` when nothing was changed.
    pub inverse: Option<ListOp<R>>,
    pub applied_at: Timestamp,
}

impl<R: CacheableRecord> PendingPatch<R> {
    pub fn is_noop(&self) -> bool {
        self.inverse.is_none()
    }
}

/// The patches of one mutation, in application order.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchSet<R: CacheableRecord> {
    patches: Vec<PendingPatch<R>>,
}

impl<R: CacheableRecord> Default for PatchSet<R> {
    fn default() -> Self {
        Self {
            patches: Vec::new(),
        }
    }
}

impl<R: CacheableRecord> PatchSet<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a patch. No-op patches are dropped.
    pub fn push(&mut self, patch: PendingPatch<R>) {
        if !patch.is_noop() {
            self.patches.push(patch);
        }
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    /// Fingerprints touched by this set, in application order.
    pub fn fingerprints(&self) -> impl Iterator<Item = &Fingerprint> {
        self.patches.iter().map(|p| &p.fingerprint)
    }

    /// Patches in the order they must be undone.
    pub fn into_rollback_order(self) -> impl Iterator<Item = PendingPatch<R>> {
        self.patches.into_iter().rev()
    }
}
