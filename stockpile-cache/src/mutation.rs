//! Mutation engine with optimistic patches.
//!
//! Creates and updates publish a speculative edit into every cached page of
//! the resource's list endpoint before the write is sent. The edits of one
//! mutation are collected in a [`PatchSet`]; on success each page is
//! reconciled with the server record, on failure the set is undone newest
//! first. Deletes are not applied optimistically; they invalidate the
//! resource tag once the backend confirms.

use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use stockpile_core::{
    ApiError, Envelope, Fingerprint, Method, MutationError, RecordId, RequestDescriptor,
    Resource, Tag, Transport,
};
use tracing::{debug, info, warn};

use crate::patch::{ListOp, PatchSet};
use crate::query::QueryCache;
use crate::traits::CacheableRecord;

/// Source of temporary identifiers for optimistic records.
///
/// Yields `-1, -2, -3, ...`. Server ids are positive, so a temporary id can
/// never collide with one, and two optimistic creates issued at the same
/// instant still get distinct ids.
#[derive(Debug)]
pub struct TempIdGenerator {
    next: AtomicI64,
}

impl Default for TempIdGenerator {
    fn default() -> Self {
        Self {
            next: AtomicI64::new(-1),
        }
    }
}

impl TempIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> RecordId {
        self.next.fetch_sub(1, Ordering::Relaxed)
    }
}

/// Executes writes against the backend and keeps the query cache in step.
///
/// Clones share the cache, the transport and the temporary id sequence.
pub struct MutationEngine<R: CacheableRecord> {
    cache: QueryCache<R>,
    transport: Arc<dyn Transport>,
    temp_ids: Arc<TempIdGenerator>,
}

impl<R: CacheableRecord> Clone for MutationEngine<R> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            transport: Arc::clone(&self.transport),
            temp_ids: Arc::clone(&self.temp_ids),
        }
    }
}

impl<R: CacheableRecord> MutationEngine<R> {
    /// Create an engine writing through the cache's own transport.
    pub fn new(cache: QueryCache<R>) -> Self {
        let transport = cache.transport();
        Self::with_transport(cache, transport)
    }

    pub fn with_transport(cache: QueryCache<R>, transport: Arc<dyn Transport>) -> Self {
        Self {
            cache,
            transport,
            temp_ids: Arc::new(TempIdGenerator::new()),
        }
    }

    pub fn cache(&self) -> &QueryCache<R> {
        &self.cache
    }

    /// Create a record.
    ///
    /// An optimistic record with a temporary id is prepended to every cached
    /// page of `resource` before the request is sent. On success it is
    /// replaced in place by the server record and the resource tag is
    /// invalidated.
    pub async fn create(&self, resource: Resource, draft: R::Draft) -> Result<R, MutationError> {
        let body = encode(&draft)?;
        let temp_id = self.temp_ids.next_id();
        let placeholder = R::optimistic(temp_id, &draft, chrono::Utc::now());
        let patches = self.patch_lists(resource, || ListOp::Prepend(placeholder.clone()));
        debug!(
            resource = %resource,
            temp_id,
            patched = patches.len(),
            "optimistic create applied"
        );

        let request = RequestDescriptor::post(resource.path(), body);
        let outcome = self.transport.send(request).await;
        let (record, patched) = self.settle(resource, patches, outcome, true)?;
        for fingerprint in &patched {
            self.cache.apply(
                fingerprint,
                ListOp::ReplaceById {
                    id: temp_id,
                    record: record.clone(),
                },
            );
        }
        self.cache.invalidate(resource.tag());
        info!(resource = %resource, id = record.record_id(), temp_id, "record created");
        Ok(record)
    }

    /// Replace the editable fields of a record (`PUT`).
    pub async fn update(&self, resource: Resource, changes: R::Changes) -> Result<R, MutationError> {
        self.merge_write(Method::Put, resource, changes).await
    }

    /// Change some fields of a record (`PATCH`).
    pub async fn patch(&self, resource: Resource, changes: R::Changes) -> Result<R, MutationError> {
        self.merge_write(Method::Patch, resource, changes).await
    }

    async fn merge_write(
        &self,
        method: Method,
        resource: Resource,
        changes: R::Changes,
    ) -> Result<R, MutationError> {
        let body = encode(&changes)?;
        let id = R::changes_target(&changes);
        let patches = self.patch_lists(resource, || ListOp::MergeById {
            id,
            changes: changes.clone(),
        });
        debug!(resource = %resource, id, patched = patches.len(), "optimistic update applied");

        let request = RequestDescriptor::new(method, resource.record_path(id)).with_data(body);
        let outcome = self.transport.send(request).await;
        let (record, patched) = self.settle(resource, patches, outcome, false)?;
        for fingerprint in &patched {
            self.cache.apply(
                fingerprint,
                ListOp::ReplaceById {
                    id,
                    record: record.clone(),
                },
            );
        }
        info!(resource = %resource, id, method = %method, "record updated");
        Ok(record)
    }

    /// Delete a record. The resource tag is invalidated on success.
    pub async fn delete(&self, resource: Resource, id: RecordId) -> Result<R, MutationError> {
        let request = RequestDescriptor::delete(resource.record_path(id));
        let body = self.transport.send(request).await.map_err(|error| {
            warn!(resource = %resource, id, error = %error, "delete failed");
            MutationError::from(error)
        })?;
        self.cache.invalidate(resource.tag());
        let record = decode_record::<R>(body)?;
        info!(resource = %resource, id, "record deleted");
        Ok(record)
    }

    /// Send an arbitrary write and invalidate `invalidates` on success.
    pub async fn mutate(
        &self,
        request: RequestDescriptor,
        invalidates: &[Tag],
    ) -> Result<Value, MutationError> {
        let method = request.method;
        let url = request.url.clone();
        let body = self.transport.send(request).await.map_err(|error| {
            warn!(method = %method, url = %url, error = %error, "mutation failed");
            MutationError::from(error)
        })?;
        for tag in invalidates {
            self.cache.invalidate(*tag);
        }
        Ok(body)
    }

    /// Apply `op` to every cached page of the resource's list endpoint.
    fn patch_lists(&self, resource: Resource, op: impl Fn() -> ListOp<R>) -> PatchSet<R> {
        let endpoint = resource.list_endpoint_name();
        let mut patches = PatchSet::new();
        for args in self.cache.cached_args_for(endpoint) {
            let fingerprint = Fingerprint::from_normalized(endpoint, &args);
            patches.push(self.cache.apply(&fingerprint, op()));
        }
        patches
    }

    /// Decode a write outcome, rolling back `patches` if it failed.
    ///
    /// On success the patches are discarded and the fingerprints they
    /// touched are returned for reconciliation. A success response without a
    /// usable record also rolls back, and invalidates the tag since the
    /// write may have been applied.
    fn settle(
        &self,
        resource: Resource,
        patches: PatchSet<R>,
        outcome: Result<Value, ApiError>,
        is_create: bool,
    ) -> Result<(R, Vec<Fingerprint>), MutationError> {
        let error = match outcome.map(decode_record::<R>) {
            Ok(Ok(record)) => {
                let patched = patches.fingerprints().cloned().collect();
                return Ok((record, patched));
            }
            Ok(Err(error)) => {
                self.cache.invalidate(resource.tag());
                error
            }
            Err(error) => error,
        };

        let undone = self.cache.rollback(patches);
        warn!(
            resource = %resource,
            create = is_create,
            undone,
            error = %error,
            "mutation failed, optimistic patches rolled back"
        );
        Err(MutationError::from(error))
    }
}

fn encode<T: Serialize>(payload: &T) -> Result<Value, MutationError> {
    serde_json::to_value(payload).map_err(|e| {
        MutationError::Transport(ApiError::transport(format!(
            "Payload cannot be serialized: {}",
            e
        )))
    })
}

/// Pull the record out of a `{data, meta}` success body.
fn decode_record<R: CacheableRecord>(body: Value) -> Result<R, ApiError> {
    let envelope: Envelope<R> = serde_json::from_value(body)
        .map_err(|e| ApiError::transport(format!("Malformed write response: {}", e)))?;
    envelope
        .data
        .ok_or_else(|| ApiError::transport("Write response carried no record"))
}
