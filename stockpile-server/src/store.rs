//! In-memory record collections.
//!
//! Holds the `items` and `products` collections and implements the list,
//! create, update, patch and delete semantics of the mock backend. Request
//! bodies arrive as raw JSON so that type errors in the payload surface as
//! the backend's own validation messages.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use stockpile_core::{ListPage, ListQuery, Pagination, Record, RecordId, Resource};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{ServerError, ServerResult};

const NAME_REQUIRED: &str = "Name is required";
const PRICE_NOT_NUMBER: &str = "Price must be a number";
const INVALID_ID: &str = "Invalid id";
const NOT_FOUND: &str = "Item not found";

/// Initial contents of both collections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub items: Vec<Record>,
    #[serde(default)]
    pub products: Vec<Record>,
}

impl Seed {
    /// Load a seed from a JSON file shaped `{items: [...], products: [...]}`.
    pub fn from_path(path: impl AsRef<Path>) -> ServerResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ServerError::internal(format!("Failed to read seed {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            ServerError::internal(format!("Failed to parse seed {}: {}", path.display(), e))
        })
    }
}

#[derive(Debug, Default)]
struct Collections {
    items: Vec<Record>,
    products: Vec<Record>,
}

impl Collections {
    fn get(&self, resource: Resource) -> &Vec<Record> {
        match resource {
            Resource::Items => &self.items,
            Resource::Products => &self.products,
        }
    }

    fn get_mut(&mut self, resource: Resource) -> &mut Vec<Record> {
        match resource {
            Resource::Items => &mut self.items,
            Resource::Products => &mut self.products,
        }
    }
}

/// Shared in-memory store. Cloning yields a handle to the same data.
#[derive(Debug, Clone, Default)]
pub struct InventoryStore {
    collections: Arc<RwLock<Collections>>,
}

impl InventoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `seed`.
    pub fn with_seed(seed: Seed) -> Self {
        info!(
            items = seed.items.len(),
            products = seed.products.len(),
            "store seeded"
        );
        Self {
            collections: Arc::new(RwLock::new(Collections {
                items: seed.items,
                products: seed.products,
            })),
        }
    }

    /// All records of `resource`, in storage order.
    pub async fn records(&self, resource: Resource) -> Vec<Record> {
        self.collections.read().await.get(resource).clone()
    }

    pub async fn count(&self, resource: Resource) -> usize {
        self.collections.read().await.get(resource).len()
    }

    /// One page of `resource`, newest first.
    ///
    /// Pages past the end are empty; the page number is not clamped.
    pub async fn list(&self, resource: Resource, query: &ListQuery) -> ServerResult<ListPage<Record>> {
        let args = query.resolve();
        if args.status != "ok" {
            return Err(ServerError::validation("Invalid status param"));
        }
        if args.page == 0 || args.per_page == 0 {
            return Err(ServerError::validation("Invalid pagination params"));
        }

        let mut ordered = self.records(resource).await;
        sort_newest_first(&mut ordered);

        let pagination = Pagination::compute(ordered.len() as u64, args.per_page, args.page);
        let data: Vec<Record> = ordered
            .into_iter()
            .skip(usize::try_from(pagination.offset()).unwrap_or(usize::MAX))
            .take(args.per_page as usize)
            .collect();
        debug!(
            resource = %resource,
            page = args.page,
            returned = data.len(),
            "listed records"
        );
        Ok(ListPage::new(data, pagination))
    }

    /// Create a record from `{name, price}`.
    pub async fn create(&self, resource: Resource, body: &Value) -> ServerResult<Record> {
        let name = required_name(body)?;
        let price = required_price(body)?;

        let mut collections = self.collections.write().await;
        let records = collections.get_mut(resource);
        let id = records.iter().map(|r| r.id).fold(0, RecordId::max) + 1;
        let record = Record::new(id, name, price).with_created_at(chrono::Utc::now());
        records.push(record.clone());
        info!(resource = %resource, id, "record created");
        Ok(record)
    }

    /// Replace name and price of record `id`.
    pub async fn update(&self, resource: Resource, id: &str, body: &Value) -> ServerResult<Record> {
        let id = parse_id(id)?;
        let name = required_name(body)?;
        let price = required_price(body)?;

        let mut collections = self.collections.write().await;
        let record = find_mut(collections.get_mut(resource), id)?;
        record.name = name;
        record.price = price;
        info!(resource = %resource, id, "record updated");
        Ok(record.clone())
    }

    /// Shallow-merge the supplied fields into record `id`.
    pub async fn patch(&self, resource: Resource, id: &str, body: &Value) -> ServerResult<Record> {
        let id = parse_id(id)?;
        let mut collections = self.collections.write().await;
        let record = find_mut(collections.get_mut(resource), id)?;

        let fields = match body {
            Value::Object(fields) => fields,
            Value::Null => return Ok(record.clone()),
            _ => return Err(ServerError::validation("Invalid body")),
        };
        let name = match fields.get("name") {
            Some(_) => Some(required_name(body)?),
            None => None,
        };
        let price = match fields.get("price") {
            Some(_) => Some(required_price(body)?),
            None => None,
        };

        if let Some(name) = name {
            record.name = name;
        }
        if let Some(price) = price {
            record.price = price;
        }
        info!(resource = %resource, id, "record patched");
        Ok(record.clone())
    }

    /// Remove record `id`, returning it.
    pub async fn delete(&self, resource: Resource, id: &str) -> ServerResult<Record> {
        let id = parse_id(id)?;
        let mut collections = self.collections.write().await;
        let records = collections.get_mut(resource);
        let index = records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| ServerError::not_found(NOT_FOUND))?;
        let removed = records.remove(index);
        info!(resource = %resource, id, "record deleted");
        Ok(removed)
    }
}

/// Newest `createdAt` first; records without one sort last. Ties go to the
/// higher id.
pub fn sort_newest_first(records: &mut [Record]) {
    records.sort_by(Record::newest_first);
}

fn required_name(body: &Value) -> ServerResult<String> {
    body.get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ServerError::validation(NAME_REQUIRED))
}

fn required_price(body: &Value) -> ServerResult<f64> {
    body.get("price")
        .and_then(Value::as_f64)
        .ok_or_else(|| ServerError::validation(PRICE_NOT_NUMBER))
}

fn parse_id(raw: &str) -> ServerResult<RecordId> {
    raw.parse::<RecordId>()
        .map_err(|_| ServerError::validation(INVALID_ID))
}

fn find_mut(records: &mut [Record], id: RecordId) -> ServerResult<&mut Record> {
    records
        .iter_mut()
        .find(|r| r.id == id)
        .ok_or_else(|| ServerError::not_found(NOT_FOUND))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn at(secs: i64) -> stockpile_core::Timestamp {
        chrono::DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn test_sort_newest_first_with_ties_and_missing() {
        let mut records = vec![
            Record::new(1, "a", 1.0).with_created_at(at(100)),
            Record::new(2, "b", 1.0),
            Record::new(3, "c", 1.0).with_created_at(at(200)),
            Record::new(4, "d", 1.0).with_created_at(at(100)),
        ];
        sort_newest_first(&mut records);
        let ids: Vec<_> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 4, 1, 2]);
    }

    #[tokio::test]
    async fn test_create_assigns_next_id() {
        let store = InventoryStore::with_seed(Seed {
            items: vec![Record::new(7, "old", 1.0)],
            products: vec![],
        });
        let created = store
            .create(Resource::Items, &json!({"name": "Widget", "price": 9.99}))
            .await
            .unwrap();
        assert_eq!(created.id, 8);
        assert!(created.created_at.is_some());

        let first_product = store
            .create(Resource::Products, &json!({"name": "Gear", "price": 3}))
            .await
            .unwrap();
        assert_eq!(first_product.id, 1);
        assert_eq!(first_product.price, 3.0);
    }

    #[tokio::test]
    async fn test_create_validation_messages() {
        let store = InventoryStore::new();
        let missing = store.create(Resource::Items, &json!({"price": 1.0})).await;
        assert_eq!(missing, Err(ServerError::validation("Name is required")));

        let empty = store.create(Resource::Items, &json!({"name": "", "price": 1.0})).await;
        assert_eq!(empty, Err(ServerError::validation("Name is required")));

        let text_price = store
            .create(Resource::Items, &json!({"name": "x", "price": "1.0"}))
            .await;
        assert_eq!(text_price, Err(ServerError::validation("Price must be a number")));
        assert_eq!(store.count(Resource::Items).await, 0);
    }

    #[tokio::test]
    async fn test_update_checks_id_then_body_then_existence() {
        let store = InventoryStore::new();
        assert_eq!(
            store.update(Resource::Items, "abc", &json!({})).await,
            Err(ServerError::validation("Invalid id"))
        );
        assert_eq!(
            store.update(Resource::Items, "1", &json!({"price": 1})).await,
            Err(ServerError::validation("Name is required"))
        );
        assert_eq!(
            store.update(Resource::Items, "1", &json!({"name": "n", "price": 1})).await,
            Err(ServerError::not_found("Item not found"))
        );
    }

    #[tokio::test]
    async fn test_patch_merges_supplied_fields() {
        let created_at = at(1_000);
        let store = InventoryStore::with_seed(Seed {
            items: vec![Record::new(1, "Bolt", 1.0).with_created_at(created_at)],
            products: vec![],
        });
        let patched = store
            .patch(Resource::Items, "1", &json!({"price": 2.5, "color": "red"}))
            .await
            .unwrap();
        assert_eq!(patched.name, "Bolt");
        assert_eq!(patched.price, 2.5);
        assert_eq!(patched.created_at, Some(created_at));

        let bad = store.patch(Resource::Items, "1", &json!({"price": "cheap"})).await;
        assert_eq!(bad, Err(ServerError::validation("Price must be a number")));
        assert_eq!(store.records(Resource::Items).await[0].price, 2.5);
    }

    #[tokio::test]
    async fn test_delete_returns_removed_record() {
        let store = InventoryStore::with_seed(Seed {
            items: vec![],
            products: vec![Record::new(1, "a", 1.0), Record::new(2, "b", 2.0)],
        });
        let removed = store.delete(Resource::Products, "1").await.unwrap();
        assert_eq!(removed.name, "a");
        assert_eq!(store.count(Resource::Products).await, 1);
        assert_eq!(
            store.delete(Resource::Products, "1").await,
            Err(ServerError::not_found("Item not found"))
        );
    }

    #[tokio::test]
    async fn test_list_rejects_bad_params() {
        let store = InventoryStore::new();
        let bad_status = store
            .list(Resource::Items, &ListQuery::new().with_status("all"))
            .await;
        assert_eq!(bad_status, Err(ServerError::validation("Invalid status param")));

        let zero = store.list(Resource::Items, &ListQuery::page(0)).await;
        assert_eq!(zero, Err(ServerError::validation("Invalid pagination params")));
    }

    #[test]
    fn test_seed_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        std::fs::write(
            &path,
            r#"{"items": [{"id": 1, "name": "Widget", "price": 9.99, "createdAt": "2024-01-01T00:00:00Z"}]}"#,
        )
        .unwrap();
        let seed = Seed::from_path(&path).unwrap();
        assert_eq!(seed.items.len(), 1);
        assert!(seed.products.is_empty());

        assert!(matches!(
            Seed::from_path(dir.path().join("missing.json")),
            Err(ServerError::Internal(_))
        ));
    }
}
