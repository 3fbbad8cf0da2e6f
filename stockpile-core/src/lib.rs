//! Stockpile Core - Record and Wire Types
//!
//! Plain data structures shared by the cache, the mock backend and the
//! HTTP client. All other crates depend on this. The only behavior here is
//! what the wire format itself needs: argument normalization for
//! fingerprints, envelope construction and error classification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

pub mod envelope;
pub mod error;
pub mod fingerprint;
pub mod transport;

pub use envelope::{Envelope, ListArgs, ListPage, ListQuery, Meta, Pagination};
pub use error::{
    ApiError, ErrorKind, ErrorText, FingerprintError, MutationError, StockpileError,
    StockpileResult,
};
pub use fingerprint::{fingerprint, Fingerprint, QueryEndpoint};
pub use transport::{Method, RequestDescriptor, Transport, TransportResult};

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Record identifier. Server-assigned ids are positive; optimistic
/// placeholders use negative values.
pub type RecordId = i64;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

// ============================================================================
// RESOURCES
// ============================================================================

/// Cache tag provided by list queries and invalidated by mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tag {
    Items,
    Products,
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Items => f.write_str("Items"),
            Tag::Products => f.write_str("Products"),
        }
    }
}

/// The two record collections served by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Items,
    Products,
}

impl Resource {
    /// Every resource, in a stable order.
    pub const ALL: [Resource; 2] = [Resource::Items, Resource::Products];

    /// Collection name used by the backend store.
    pub fn collection(&self) -> &'static str {
        match self {
            Resource::Items => "items",
            Resource::Products => "products",
        }
    }

    /// Resolve a collection name as it appears in a URL.
    pub fn from_collection(name: &str) -> Option<Resource> {
        Resource::ALL.into_iter().find(|r| r.collection() == name)
    }

    /// URL path of the collection.
    pub fn path(&self) -> &'static str {
        match self {
            Resource::Items => "/items",
            Resource::Products => "/products",
        }
    }

    /// URL path of a single record.
    pub fn record_path(&self, id: RecordId) -> String {
        format!("{}/{}", self.path(), id)
    }

    /// Tag provided by this resource's list query.
    pub fn tag(&self) -> Tag {
        match self {
            Resource::Items => Tag::Items,
            Resource::Products => Tag::Products,
        }
    }

    /// Name of the list endpoint, used as the fingerprint prefix.
    pub fn list_endpoint_name(&self) -> &'static str {
        match self {
            Resource::Items => "getItems",
            Resource::Products => "getProducts",
        }
    }

    /// The paginated list endpoint for this resource.
    pub fn list_endpoint(&self) -> QueryEndpoint {
        QueryEndpoint::new(self.list_endpoint_name(), self.path(), self.tag())
            .with_defaults(ListArgs::default().to_value())
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection())
    }
}

// ============================================================================
// RECORDS
// ============================================================================

/// An inventory record (item or product).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: RecordId,
    pub name: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
}

impl Record {
    pub fn new(id: RecordId, name: impl Into<String>, price: f64) -> Self {
        Self {
            id,
            name: name.into(),
            price,
            created_at: None,
        }
    }

    pub fn with_created_at(mut self, created_at: Timestamp) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Whether this record carries a client-side placeholder id.
    pub fn is_optimistic(&self) -> bool {
        self.id < 0
    }

    /// List order: newest `createdAt` first, records without one last,
    /// ties broken by the higher id.
    pub fn newest_first(a: &Record, b: &Record) -> Ordering {
        b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id))
    }
}

/// Payload for creating a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordDraft {
    pub name: String,
    pub price: f64,
}

impl RecordDraft {
    pub fn new(name: impl Into<String>, price: f64) -> Self {
        Self {
            name: name.into(),
            price,
        }
    }
}

/// Field changes for an existing record.
///
/// Serializes to the request body only; the id travels in the URL.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordChanges {
    #[serde(skip_serializing)]
    pub id: RecordId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

impl RecordChanges {
    pub fn new(id: RecordId) -> Self {
        Self {
            id,
            name: None,
            price: None,
        }
    }

    /// Changes replacing both editable fields.
    pub fn full(id: RecordId, name: impl Into<String>, price: f64) -> Self {
        Self {
            id,
            name: Some(name.into()),
            price: Some(price),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    /// Shallow-merge the supplied fields over `record`.
    pub fn apply_to(&self, record: &mut Record) {
        if let Some(name) = &self.name {
            record.name = name.clone();
        }
        if let Some(price) = self.price {
            record.price = price;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.price.is_none()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_wire_format_is_camel_case() {
        let created = "2024-01-02T03:04:05Z".parse::<Timestamp>().unwrap();
        let record = Record::new(7, "Widget", 9.99).with_created_at(created);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["createdAt"], json!("2024-01-02T03:04:05Z"));
        assert_eq!(value["id"], json!(7));

        let back: Record = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_record_without_created_at() {
        let record: Record =
            serde_json::from_value(json!({"id": 1, "name": "a", "price": 2.0})).unwrap();
        assert!(record.created_at.is_none());
        assert!(!record.is_optimistic());
        assert!(Record::new(-3, "tmp", 1.0).is_optimistic());
    }

    #[test]
    fn test_changes_body_omits_id_and_missing_fields() {
        let changes = RecordChanges::new(4).with_price(3.5);
        assert_eq!(serde_json::to_value(&changes).unwrap(), json!({"price": 3.5}));

        let full = RecordChanges::full(4, "Bolt", 1.25);
        assert_eq!(
            serde_json::to_value(&full).unwrap(),
            json!({"name": "Bolt", "price": 1.25})
        );
    }

    #[test]
    fn test_changes_shallow_merge() {
        let mut record = Record::new(1, "Nut", 0.5);
        RecordChanges::new(1).with_name("Hex nut").apply_to(&mut record);
        assert_eq!(record.name, "Hex nut");
        assert_eq!(record.price, 0.5);
        assert!(RecordChanges::new(1).is_empty());
    }

    #[test]
    fn test_resource_routing() {
        assert_eq!(Resource::Items.path(), "/items");
        assert_eq!(Resource::Products.record_path(12), "/products/12");
        assert_eq!(Resource::Items.tag(), Tag::Items);
        assert_eq!(Resource::Products.list_endpoint().name, "getProducts");
        assert_eq!(Resource::from_collection("items"), Some(Resource::Items));
        assert_eq!(Resource::from_collection("orders"), None);
        assert_eq!(Tag::Products.to_string(), "Products");
    }
}
