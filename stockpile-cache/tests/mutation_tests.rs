//! Optimistic mutation: speculative patches, reconciliation and rollback.

use serde_json::json;
use std::sync::Arc;
use stockpile_cache::{CacheConfig, MutationEngine, QueryCache, Subscription};
use stockpile_test_utils::assertions::{
    assert_ids, assert_not_found, assert_transport_error, assert_validation_error,
};
use stockpile_test_utils::fixtures::{sample_records, server_record, single_page, widget_draft};
use stockpile_test_utils::{
    list_body, not_found_error, record_body, validation_error, Gate, ListQuery, Method,
    MutationError, Record, RecordChanges, RecordDraft, RequestDescriptor, Resource,
    ScriptedTransport, Tag,
};
use tokio::task::JoinHandle;

struct Harness {
    transport: Arc<ScriptedTransport>,
    engine: MutationEngine<Record>,
}

impl Harness {
    fn new() -> Self {
        let transport = Arc::new(ScriptedTransport::new());
        let cache = QueryCache::new(transport.clone(), CacheConfig::default());
        Self {
            engine: MutationEngine::new(cache),
            transport,
        }
    }

    fn cache(&self) -> &QueryCache<Record> {
        self.engine.cache()
    }

    /// Subscribe to `query` of `resource` and wait for `body` to land.
    async fn cached_page(
        &self,
        resource: Resource,
        query: ListQuery,
        body: serde_json::Value,
    ) -> Subscription<Record> {
        self.transport.respond_ok(body);
        let mut sub = self
            .cache()
            .subscribe(&resource.list_endpoint(), &query)
            .unwrap();
        sub.settled().await.unwrap();
        sub
    }
}

fn records(sub: &Subscription<Record>) -> Vec<Record> {
    sub.snapshot().unwrap().records().to_vec()
}

#[tokio::test]
async fn create_shows_temporary_record_then_server_record() {
    let h = Harness::new();
    let mut page = h
        .cached_page(Resource::Items, ListQuery::new(), list_body(&[], 0, 5, 1))
        .await;
    let reads_before = h.transport.read_count();

    let gate = h.transport.hold_write();
    let pending = {
        let engine = h.engine.clone();
        tokio::spawn(async move { engine.create(Resource::Items, widget_draft()).await })
    };
    h.transport.wait_for_calls(reads_before + 1).await;

    let optimistic = records(&page);
    assert_eq!(optimistic.len(), 1);
    assert!(optimistic[0].id < 0);
    assert_eq!(optimistic[0].name, "Widget");
    assert_eq!(optimistic[0].price, 9.99);
    assert!(optimistic[0].created_at.is_some());

    let created = server_record(1, "Widget", 9.99);
    h.transport.respond_ok(single_page(&[created.clone()]));
    gate.ok(record_body(&created));

    let returned = pending.await.unwrap().unwrap();
    assert_eq!(returned, created);
    assert_eq!(records(&page), vec![created.clone()]);

    let settled = page.settled().await.unwrap();
    assert_eq!(settled.records(), &[created][..]);
    assert_eq!(h.transport.read_count(), reads_before + 1, "tag invalidated");
}

#[tokio::test]
async fn create_patches_every_cached_page_of_the_resource() {
    let h = Harness::new();
    let p1 = h
        .cached_page(Resource::Products, ListQuery::page(1), list_body(&sample_records(2), 7, 2, 1))
        .await;
    let p2 = h
        .cached_page(Resource::Products, ListQuery::page(2), list_body(&sample_records(2), 7, 2, 2))
        .await;
    let items = h
        .cached_page(Resource::Items, ListQuery::new(), single_page(&sample_records(1)))
        .await;

    let gate = h.transport.hold_write();
    let pending = {
        let engine = h.engine.clone();
        tokio::spawn(async move {
            engine
                .create(Resource::Products, RecordDraft::new("Sprocket", 3.0))
                .await
        })
    };
    h.transport.wait_for_calls(4).await;

    assert!(records(&p1)[0].id < 0);
    assert!(records(&p2)[0].id < 0);
    assert_ids(&records(&items), &[1]);

    gate.err(validation_error("Price must be a number"));
    let result = pending.await.unwrap();
    assert_validation_error(&result);
    assert_ids(&records(&p1), &[2, 1]);
    assert_ids(&records(&p2), &[2, 1]);
}

#[tokio::test]
async fn failed_create_restores_pages_exactly() {
    let h = Harness::new();
    let page = h
        .cached_page(Resource::Items, ListQuery::new(), single_page(&sample_records(3)))
        .await;
    let before = page.snapshot().unwrap().value;
    let reads_before = h.transport.read_count();

    h.transport.write_err(validation_error("Name is required"));
    let result = h
        .engine
        .create(Resource::Items, RecordDraft::new("", 1.0))
        .await;

    assert_validation_error(&result);
    assert_eq!(page.snapshot().unwrap().value, before);
    assert_eq!(h.transport.read_count(), reads_before, "no invalidation on failure");
}

#[tokio::test]
async fn create_transport_failure_rolls_back() {
    let h = Harness::new();
    let page = h
        .cached_page(Resource::Items, ListQuery::new(), single_page(&sample_records(2)))
        .await;
    let before = page.snapshot().unwrap().value;

    let result = h.engine.create(Resource::Items, widget_draft()).await;

    assert_transport_error(&result);
    assert_eq!(page.snapshot().unwrap().value, before);
}

#[tokio::test]
async fn create_without_record_in_response_rolls_back_and_invalidates() {
    let h = Harness::new();
    let mut page = h
        .cached_page(Resource::Items, ListQuery::new(), single_page(&sample_records(1)))
        .await;

    h.transport
        .write_ok(json!({"meta": {"success": true, "errors": ""}}));
    h.transport.respond_ok(single_page(&sample_records(2)));
    let result = h.engine.create(Resource::Items, widget_draft()).await;

    assert_transport_error(&result);
    assert_ids(&records(&page), &[1]);
    let refetched = page.settled().await.unwrap();
    assert_ids(refetched.records(), &[2, 1]);
}

#[tokio::test]
async fn update_unknown_id_is_net_zero() {
    let h = Harness::new();
    let page = h
        .cached_page(Resource::Items, ListQuery::new(), single_page(&sample_records(3)))
        .await;
    let before = page.snapshot().unwrap().value;

    h.transport.write_err(not_found_error("Item not found"));
    let result = h
        .engine
        .update(Resource::Items, RecordChanges::full(99, "Ghost", 1.0))
        .await;

    assert_not_found(&result);
    assert_eq!(page.snapshot().unwrap().value, before);
    let request = h.transport.requests().pop().unwrap();
    assert_eq!(request.method, Method::Put);
    assert_eq!(request.url, "/items/99");
}

#[tokio::test]
async fn update_merges_optimistically_then_takes_server_record() {
    let h = Harness::new();
    let page = h
        .cached_page(Resource::Items, ListQuery::new(), single_page(&sample_records(3)))
        .await;
    let reads_before = h.transport.read_count();

    let gate = h.transport.hold_write();
    let pending = {
        let engine = h.engine.clone();
        tokio::spawn(async move {
            engine
                .update(Resource::Items, RecordChanges::full(2, "Renamed", 7.25))
                .await
        })
    };
    h.transport.wait_for_calls(reads_before + 1).await;

    let merged = records(&page);
    assert_eq!(merged[1].name, "Renamed");
    assert_eq!(merged[1].price, 7.25);
    assert!(merged[1].created_at.is_none());

    let authoritative = server_record(2, "Renamed", 7.25);
    gate.ok(record_body(&authoritative));
    pending.await.unwrap().unwrap();

    assert_eq!(records(&page)[1], authoritative);
    assert_eq!(h.transport.read_count(), reads_before, "updates do not invalidate");
}

#[tokio::test]
async fn failed_update_reverts_merge() {
    let h = Harness::new();
    let page = h
        .cached_page(Resource::Items, ListQuery::new(), single_page(&sample_records(3)))
        .await;
    let before = page.snapshot().unwrap().value;

    let gate = h.transport.hold_write();
    let pending = {
        let engine = h.engine.clone();
        tokio::spawn(async move {
            engine
                .update(Resource::Items, RecordChanges::full(3, "Broken", -1.0))
                .await
        })
    };
    h.transport.wait_for_calls(2).await;
    assert_eq!(records(&page)[0].name, "Broken");

    gate.err(validation_error("Price must be a number"));
    assert_validation_error(&pending.await.unwrap());
    assert_eq!(page.snapshot().unwrap().value, before);
}

#[tokio::test]
async fn patch_sends_only_changed_fields() {
    let h = Harness::new();
    let page = h
        .cached_page(Resource::Products, ListQuery::new(), single_page(&sample_records(2)))
        .await;

    let mut patched = sample_records(2)[0].clone();
    patched.price = 0.5;
    h.transport.write_ok(record_body(&patched));
    let result = h
        .engine
        .patch(Resource::Products, RecordChanges::new(2).with_price(0.5))
        .await
        .unwrap();

    assert_eq!(result, patched);
    assert_eq!(records(&page)[0], patched);
    let request = h.transport.requests().pop().unwrap();
    assert_eq!(request.method, Method::Patch);
    assert_eq!(request.url, "/products/2");
    assert_eq!(request.data, Some(json!({"price": 0.5})));
}

#[tokio::test]
async fn delete_invalidates_instead_of_patching() {
    let h = Harness::new();
    let mut page = h
        .cached_page(Resource::Items, ListQuery::new(), single_page(&sample_records(3)))
        .await;

    let removed = sample_records(3)[1].clone();
    h.transport.write_ok(record_body(&removed));
    h.transport.respond_ok(single_page(&[
        sample_records(3)[0].clone(),
        sample_records(3)[2].clone(),
    ]));
    let result = h.engine.delete(Resource::Items, 2).await.unwrap();

    assert_eq!(result, removed);
    assert_ids(&records(&page), &[3, 2, 1]);
    let refetched = page.settled().await.unwrap();
    assert_ids(refetched.records(), &[3, 1]);
}

#[tokio::test]
async fn failed_delete_leaves_cache_alone() {
    let h = Harness::new();
    let page = h
        .cached_page(Resource::Items, ListQuery::new(), single_page(&sample_records(2)))
        .await;
    let reads_before = h.transport.read_count();

    h.transport.write_err(not_found_error("Item not found"));
    let result = h.engine.delete(Resource::Items, 42).await;

    assert_not_found(&result);
    assert_ids(&records(&page), &[2, 1]);
    assert_eq!(h.transport.read_count(), reads_before);
}

#[tokio::test]
async fn concurrent_mutations_roll_back_independently() {
    let h = Harness::new();
    let mut page = h
        .cached_page(Resource::Items, ListQuery::new(), single_page(&sample_records(1)))
        .await;

    let gate_a = h.transport.hold_write();
    let gate_b = h.transport.hold_write();
    let a = {
        let engine = h.engine.clone();
        tokio::spawn(async move { engine.create(Resource::Items, RecordDraft::new("A", 1.0)).await })
    };
    h.transport.wait_for_calls(2).await;
    let b = {
        let engine = h.engine.clone();
        tokio::spawn(async move { engine.create(Resource::Items, RecordDraft::new("B", 2.0)).await })
    };
    h.transport.wait_for_calls(3).await;

    let both = records(&page);
    assert_eq!(both.len(), 3);
    let (temp_b, temp_a) = (both[0].id, both[1].id);
    assert!(temp_a < 0 && temp_b < 0 && temp_a != temp_b);

    gate_a.err(validation_error("Name is required"));
    assert_validation_error(&a.await.unwrap());
    assert_ids(&records(&page), &[temp_b, 1]);

    let created = server_record(2, "B", 2.0);
    h.transport.respond_ok(single_page(&[created.clone(), sample_records(1)[0].clone()]));
    gate_b.ok(record_body(&created));
    assert_eq!(b.await.unwrap().unwrap(), created);
    assert_ids(&records(&page), &[2, 1]);
    assert_ids(page.settled().await.unwrap().records(), &[2, 1]);
}

type PendingWrite = (Gate, JoinHandle<Result<Record, MutationError>>);

/// Hold two patches of record 1: A renames it, B reprices it.
async fn two_pending_patches(h: &Harness) -> (PendingWrite, PendingWrite) {
    let calls = h.transport.call_count();
    let mut pending = Vec::new();
    for (offset, changes) in [
        RecordChanges::new(1).with_name("A-name"),
        RecordChanges::new(1).with_price(777.0),
    ]
    .into_iter()
    .enumerate()
    {
        let gate = h.transport.hold_write();
        let engine = h.engine.clone();
        let task = tokio::spawn(async move { engine.patch(Resource::Items, changes).await });
        h.transport.wait_for_calls(calls + offset + 1).await;
        pending.push((gate, task));
    }
    let b = pending.pop().unwrap();
    let a = pending.pop().unwrap();
    (a, b)
}

#[tokio::test]
async fn same_record_patches_show_both_fields_while_pending() {
    let h = Harness::new();
    let page = h
        .cached_page(Resource::Items, ListQuery::new(), single_page(&sample_records(1)))
        .await;

    let ((gate_a, a), (gate_b, b)) = two_pending_patches(&h).await;
    assert_eq!(records(&page), vec![Record::new(1, "A-name", 777.0)]);

    gate_a.ok(record_body(&Record::new(1, "A-name", 1.5)));
    a.await.unwrap().unwrap();
    gate_b.ok(record_body(&Record::new(1, "A-name", 777.0)));
    b.await.unwrap().unwrap();
    assert_eq!(records(&page), vec![Record::new(1, "A-name", 777.0)]);
}

#[tokio::test]
async fn failed_patch_keeps_pending_patch_of_other_field() {
    let h = Harness::new();
    let page = h
        .cached_page(Resource::Items, ListQuery::new(), single_page(&sample_records(1)))
        .await;

    let ((gate_a, a), (gate_b, b)) = two_pending_patches(&h).await;

    gate_a.err(validation_error("Name is required"));
    assert_validation_error(&a.await.unwrap());
    assert_eq!(records(&page), vec![Record::new(1, "Record 1", 777.0)]);

    let accepted = Record::new(1, "Record 1", 777.0);
    gate_b.ok(record_body(&accepted));
    assert_eq!(b.await.unwrap().unwrap(), accepted);
    assert_eq!(records(&page), vec![accepted]);
}

#[tokio::test]
async fn later_patch_failing_keeps_earlier_pending_patch() {
    let h = Harness::new();
    let page = h
        .cached_page(Resource::Items, ListQuery::new(), single_page(&sample_records(1)))
        .await;

    let ((gate_a, a), (gate_b, b)) = two_pending_patches(&h).await;

    gate_b.err(validation_error("Price must be a number"));
    assert_validation_error(&b.await.unwrap());
    assert_eq!(records(&page), vec![Record::new(1, "A-name", 1.5)]);

    let accepted = Record::new(1, "A-name", 1.5);
    gate_a.ok(record_body(&accepted));
    assert_eq!(a.await.unwrap().unwrap(), accepted);
    assert_eq!(records(&page), vec![accepted]);
}

#[tokio::test]
async fn both_patches_failing_restore_record_in_either_order() {
    for a_first in [true, false] {
        let h = Harness::new();
        let page = h
            .cached_page(Resource::Items, ListQuery::new(), single_page(&sample_records(1)))
            .await;
        let before = page.snapshot().unwrap().value;

        let ((gate_a, a), (gate_b, b)) = two_pending_patches(&h).await;
        if a_first {
            gate_a.err(validation_error("Name is required"));
            assert_validation_error(&a.await.unwrap());
            assert_eq!(records(&page), vec![Record::new(1, "Record 1", 777.0)]);
            gate_b.err(validation_error("Price must be a number"));
            assert_validation_error(&b.await.unwrap());
        } else {
            gate_b.err(validation_error("Price must be a number"));
            assert_validation_error(&b.await.unwrap());
            assert_eq!(records(&page), vec![Record::new(1, "A-name", 1.5)]);
            gate_a.err(validation_error("Name is required"));
            assert_validation_error(&a.await.unwrap());
        }

        assert_eq!(page.snapshot().unwrap().value, before, "a_first = {}", a_first);
    }
}

#[tokio::test]
async fn generic_mutate_invalidates_named_tags() {
    let h = Harness::new();
    let mut items = h
        .cached_page(Resource::Items, ListQuery::new(), single_page(&sample_records(1)))
        .await;

    h.transport.write_ok(json!({"ok": true}));
    h.transport.respond_ok(single_page(&sample_records(2)));
    let body = h
        .engine
        .mutate(RequestDescriptor::post("/items/import", json!([])), &[Tag::Items])
        .await
        .unwrap();

    assert_eq!(body, json!({"ok": true}));
    assert_eq!(items.settled().await.unwrap().records().len(), 2);
}
