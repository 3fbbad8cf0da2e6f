//! Stockpile Test Utilities
//!
//! Shared test infrastructure for the Stockpile workspace:
//! - A scripted transport whose responses can be held back
//! - Proptest generators for records, payloads and queries
//! - Fixtures for response bodies and common records
//! - Assertions on mutation outcomes

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::{oneshot, Notify};

// Re-export core types for convenience
pub use stockpile_core::{
    ApiError, ErrorKind, ListArgs, ListPage, ListQuery, Meta, Method, MutationError, Pagination,
    Record, RecordChanges, RecordDraft, RecordId, RequestDescriptor, Resource, Tag, Timestamp,
    Transport, TransportResult,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// SCRIPTED TRANSPORT
// ============================================================================

enum Step {
    Ready(TransportResult),
    Held(oneshot::Receiver<TransportResult>),
}

/// Releases one held response.
#[derive(Debug)]
pub struct Gate {
    sender: oneshot::Sender<TransportResult>,
}

impl Gate {
    pub fn release(self, result: TransportResult) {
        // The request may have been abandoned; nothing to do then.
        let _ = self.sender.send(result);
    }

    pub fn ok(self, body: Value) {
        self.release(Ok(body));
    }

    pub fn err(self, error: ApiError) {
        self.release(Err(error));
    }
}

/// Transport answering from scripted queues.
///
/// Reads (`GET`) and writes (every other method) have separate queues so a
/// test can script a write without racing the refetches it triggers. When
/// the read queue is empty the read fallback, if any, answers. Anything
/// unscripted fails with a transport error.
#[derive(Default)]
pub struct ScriptedTransport {
    reads: Mutex<VecDeque<Step>>,
    writes: Mutex<VecDeque<Step>>,
    read_fallback: Mutex<Option<TransportResult>>,
    log: Mutex<Vec<RequestDescriptor>>,
    arrived: Notify,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every unscripted read with `body`.
    pub fn with_read_fallback(self, body: Value) -> Self {
        *lock(&self.read_fallback) = Some(Ok(body));
        self
    }

    pub fn respond_ok(&self, body: Value) {
        lock(&self.reads).push_back(Step::Ready(Ok(body)));
    }

    pub fn respond_err(&self, error: ApiError) {
        lock(&self.reads).push_back(Step::Ready(Err(error)));
    }

    /// Queue a read whose response is supplied later through the gate.
    pub fn hold_read(&self) -> Gate {
        let (sender, receiver) = oneshot::channel();
        lock(&self.reads).push_back(Step::Held(receiver));
        Gate { sender }
    }

    pub fn write_ok(&self, body: Value) {
        lock(&self.writes).push_back(Step::Ready(Ok(body)));
    }

    pub fn write_err(&self, error: ApiError) {
        lock(&self.writes).push_back(Step::Ready(Err(error)));
    }

    /// Queue a write whose response is supplied later through the gate.
    pub fn hold_write(&self) -> Gate {
        let (sender, receiver) = oneshot::channel();
        lock(&self.writes).push_back(Step::Held(receiver));
        Gate { sender }
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<RequestDescriptor> {
        lock(&self.log).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.log).len()
    }

    pub fn read_count(&self) -> usize {
        lock(&self.log)
            .iter()
            .filter(|r| r.method == Method::Get)
            .count()
    }

    pub fn write_count(&self) -> usize {
        self.call_count() - self.read_count()
    }

    /// Wait until at least `count` requests have arrived.
    pub async fn wait_for_calls(&self, count: usize) {
        loop {
            let arrived = self.arrived.notified();
            if self.call_count() >= count {
                return;
            }
            arrived.await;
        }
    }

    /// Wait until at least `count` reads have arrived.
    pub async fn wait_for_reads(&self, count: usize) {
        loop {
            let arrived = self.arrived.notified();
            if self.read_count() >= count {
                return;
            }
            arrived.await;
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: RequestDescriptor) -> TransportResult {
        let is_read = request.method == Method::Get;
        let step = if is_read {
            lock(&self.reads).pop_front()
        } else {
            lock(&self.writes).pop_front()
        };
        lock(&self.log).push(request);
        self.arrived.notify_waiters();

        match step {
            Some(Step::Ready(result)) => result,
            Some(Step::Held(receiver)) => receiver
                .await
                .unwrap_or_else(|_| Err(ApiError::transport("Held response was dropped"))),
            None if is_read => lock(&self.read_fallback)
                .clone()
                .unwrap_or_else(|| Err(ApiError::transport("No scripted read response"))),
            None => Err(ApiError::transport("No scripted write response")),
        }
    }
}

// ============================================================================
// RESPONSE BODIES
// ============================================================================

/// A list response body for `records` as page `page` of `total`.
pub fn list_body(records: &[Record], total: u64, per_page: u32, page: u32) -> Value {
    let list = ListPage::new(records.to_vec(), Pagination::compute(total, per_page, page));
    serde_json::to_value(list).unwrap_or(Value::Null)
}

/// A single-record success body.
pub fn record_body(record: &Record) -> Value {
    json!({
        "data": record,
        "meta": {"success": true, "errors": ""},
    })
}

/// A failure body as the backend would send it.
pub fn error_body(message: &str) -> Value {
    json!({"meta": {"success": false, "errors": message}})
}

/// The error a transport reports for a 422 response.
pub fn validation_error(message: &str) -> ApiError {
    ApiError::from_response(422, Some(error_body(message)), "Request failed")
}

/// The error a transport reports for a 404 response.
pub fn not_found_error(message: &str) -> ApiError {
    ApiError::from_response(404, Some(error_body(message)), "Request failed")
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for Stockpile types.

    use super::*;
    use proptest::prelude::*;

    /// Generate a Timestamp within 2020-2030.
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        (1577836800i64..1893456000i64).prop_map(|secs| {
            chrono::DateTime::from_timestamp(secs, 0).unwrap_or_else(chrono::Utc::now)
        })
    }

    /// Generate a record name accepted by the backend.
    pub fn arb_name() -> impl Strategy<Value = String> {
        "[A-Za-z][A-Za-z0-9 ]{0,15}"
    }

    /// Generate a price with cent precision.
    pub fn arb_price() -> impl Strategy<Value = f64> {
        (0u32..100_000).prop_map(|cents| f64::from(cents) / 100.0)
    }

    /// Generate up to `max` records with distinct ids, newest first.
    pub fn arb_records(max: usize) -> impl Strategy<Value = Vec<Record>> {
        prop::collection::btree_map(1i64..10_000, (arb_name(), arb_price()), 0..=max).prop_map(
            |by_id| {
                by_id
                    .into_iter()
                    .rev()
                    .map(|(id, (name, price))| Record::new(id, name, price))
                    .collect()
            },
        )
    }

    pub fn arb_draft() -> impl Strategy<Value = RecordDraft> {
        (arb_name(), arb_price()).prop_map(|(name, price)| RecordDraft::new(name, price))
    }

    /// Generate non-empty changes for record `id`.
    pub fn arb_changes(id: RecordId) -> impl Strategy<Value = RecordChanges> {
        prop_oneof![
            arb_name().prop_map(move |name| RecordChanges::new(id).with_name(name)),
            arb_price().prop_map(move |price| RecordChanges::new(id).with_price(price)),
            (arb_name(), arb_price()).prop_map(move |(name, price)| RecordChanges::full(id, name, price)),
        ]
    }

    /// Generate a list query with any subset of fields supplied.
    pub fn arb_list_query() -> impl Strategy<Value = ListQuery> {
        (
            proptest::option::of(Just("ok".to_string())),
            proptest::option::of(1u32..20),
            proptest::option::of(1u32..20),
        )
            .prop_map(|(status, page, per_page)| ListQuery {
                status,
                page,
                per_page,
            })
    }

    /// One registry lifecycle step.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum PartitionOp {
        Add(String),
        Remove(String),
        Dispatch,
    }

    /// Generate a sequence of registry operations over a small name pool.
    pub fn arb_partition_ops(max: usize) -> impl Strategy<Value = Vec<PartitionOp>> {
        let name = prop_oneof![
            Just("app".to_string()),
            Just("itemUi".to_string()),
            Just("productUi".to_string()),
            Just("search".to_string()),
        ];
        let op = prop_oneof![
            name.clone().prop_map(PartitionOp::Add),
            name.prop_map(PartitionOp::Remove),
            Just(PartitionOp::Dispatch),
        ];
        prop::collection::vec(op, 0..=max)
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built records and payloads.

    use super::*;

    /// The draft used by the optimistic create scenario.
    pub fn widget_draft() -> RecordDraft {
        RecordDraft::new("Widget", 9.99)
    }

    /// A record as the backend returns it after creation.
    pub fn server_record(id: RecordId, name: &str, price: f64) -> Record {
        let created_at = chrono::DateTime::from_timestamp(1_714_521_600, 0)
            .unwrap_or_else(chrono::Utc::now);
        Record::new(id, name, price).with_created_at(created_at)
    }

    /// `count` records with ids `count..=1`, newest first.
    pub fn sample_records(count: i64) -> Vec<Record> {
        (1..=count)
            .rev()
            .map(|id| Record::new(id, format!("Record {}", id), id as f64 * 1.5))
            .collect()
    }

    /// A list body holding `records` as the only page.
    pub fn single_page(records: &[Record]) -> Value {
        list_body(records, records.len() as u64, 5, 1)
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions on mutation outcomes.

    use super::*;

    /// Assert that a mutation failed with a validation error.
    #[track_caller]
    pub fn assert_validation_error<T: std::fmt::Debug>(result: &Result<T, MutationError>) {
        match result {
            Err(MutationError::Validation(_)) => {}
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    /// Assert that a mutation failed because the record does not exist.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &Result<T, MutationError>) {
        match result {
            Err(MutationError::NotFound(e)) => assert_eq!(e.status, Some(404)),
            other => panic!("Expected NotFound error, got: {:?}", other),
        }
    }

    /// Assert that a mutation failed without a response.
    #[track_caller]
    pub fn assert_transport_error<T: std::fmt::Debug>(result: &Result<T, MutationError>) {
        match result {
            Err(MutationError::Transport(e)) => assert_eq!(e.status, None),
            other => panic!("Expected Transport error, got: {:?}", other),
        }
    }

    /// Assert the ids of `records`, in order.
    #[track_caller]
    pub fn assert_ids(records: &[Record], expected: &[RecordId]) {
        let ids: Vec<RecordId> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, expected, "unexpected record ids");
    }
}
