//! HTTP routes of the mock backend.
//!
//! - `GET    /{collection}`      paginated list
//! - `POST   /{collection}`      create
//! - `PUT    /{collection}/{id}` replace name and price
//! - `PATCH  /{collection}/{id}` shallow merge
//! - `DELETE /{collection}/{id}` remove

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use stockpile_core::{Envelope, ListPage, ListQuery, Record, Resource};
use tower_http::trace::TraceLayer;

use crate::error::{ServerError, ServerResult};
use crate::store::InventoryStore;

// ============================================================================
// TYPES
// ============================================================================

/// Raw list query string. Values stay textual so a malformed number is
/// reported as a validation error rather than an extractor rejection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub status: Option<String>,
    pub page: Option<String>,
    pub per_page: Option<String>,
}

impl ListParams {
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            match key {
                "status" => params.status = Some(value.to_string()),
                "page" => params.page = Some(value.to_string()),
                "perPage" => params.per_page = Some(value.to_string()),
                _ => {}
            }
        }
        params
    }

    pub fn into_query(self) -> ServerResult<ListQuery> {
        Ok(ListQuery {
            status: self.status,
            page: parse_count(self.page)?,
            per_page: parse_count(self.per_page)?,
        })
    }
}

fn parse_count(raw: Option<String>) -> ServerResult<Option<u32>> {
    raw.map(|value| {
        value
            .trim()
            .parse::<u32>()
            .map_err(|_| ServerError::validation("Invalid pagination params"))
    })
    .transpose()
}

/// Resolve a collection path segment.
pub fn resource(collection: &str) -> ServerResult<Resource> {
    Resource::from_collection(collection).ok_or_else(|| ServerError::not_found("Not found"))
}

// ============================================================================
// HANDLERS
// ============================================================================

async fn list_records(
    State(store): State<InventoryStore>,
    Path(collection): Path<String>,
    Query(params): Query<ListParams>,
) -> ServerResult<Json<ListPage<Record>>> {
    let resource = resource(&collection)?;
    let page = store.list(resource, &params.into_query()?).await?;
    Ok(Json(page))
}

async fn create_record(
    State(store): State<InventoryStore>,
    Path(collection): Path<String>,
    body: Option<Json<Value>>,
) -> ServerResult<Json<Envelope<Record>>> {
    let resource = resource(&collection)?;
    let record = store.create(resource, &body_value(body)).await?;
    Ok(Json(Envelope::success(record)))
}

async fn update_record(
    State(store): State<InventoryStore>,
    Path((collection, id)): Path<(String, String)>,
    body: Option<Json<Value>>,
) -> ServerResult<Json<Envelope<Record>>> {
    let resource = resource(&collection)?;
    let record = store.update(resource, &id, &body_value(body)).await?;
    Ok(Json(Envelope::success(record)))
}

async fn patch_record(
    State(store): State<InventoryStore>,
    Path((collection, id)): Path<(String, String)>,
    body: Option<Json<Value>>,
) -> ServerResult<Json<Envelope<Record>>> {
    let resource = resource(&collection)?;
    let record = store.patch(resource, &id, &body_value(body)).await?;
    Ok(Json(Envelope::success(record)))
}

async fn delete_record(
    State(store): State<InventoryStore>,
    Path((collection, id)): Path<(String, String)>,
) -> ServerResult<Json<Envelope<Record>>> {
    let resource = resource(&collection)?;
    let record = store.delete(resource, &id).await?;
    Ok(Json(Envelope::success(record)))
}

fn body_value(body: Option<Json<Value>>) -> Value {
    body.map(|Json(value)| value).unwrap_or(Value::Null)
}

// ============================================================================
// ROUTER
// ============================================================================

/// Build the backend router over `store`.
pub fn router(store: InventoryStore) -> Router {
    Router::new()
        .route("/:collection", get(list_records).post(create_record))
        .route(
            "/:collection/:id",
            axum::routing::put(update_record)
                .patch(patch_record)
                .delete(delete_record),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}
