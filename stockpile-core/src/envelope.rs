//! Response envelopes and list query arguments.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ErrorText;

/// Default `status` filter for list queries.
pub const DEFAULT_STATUS: &str = "ok";
/// Default page for list queries.
pub const DEFAULT_PAGE: u32 = 1;
/// Default page size for list queries.
pub const DEFAULT_PER_PAGE: u32 = 5;

// ============================================================================
// QUERY ARGUMENTS
// ============================================================================

/// List query as supplied by a caller; omitted fields take the endpoint defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(page: u32) -> Self {
        Self {
            page: Some(page),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = Some(per_page);
        self
    }

    /// Fill omitted fields with the declared defaults.
    pub fn resolve(&self) -> ListArgs {
        ListArgs {
            status: self
                .status
                .clone()
                .unwrap_or_else(|| DEFAULT_STATUS.to_string()),
            page: self.page.unwrap_or(DEFAULT_PAGE),
            per_page: self.per_page.unwrap_or(DEFAULT_PER_PAGE),
        }
    }
}

/// Fully resolved list arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListArgs {
    pub status: String,
    pub page: u32,
    pub per_page: u32,
}

impl Default for ListArgs {
    fn default() -> Self {
        Self {
            status: DEFAULT_STATUS.to_string(),
            page: DEFAULT_PAGE,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl ListArgs {
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "status": self.status,
            "page": self.page,
            "perPage": self.per_page,
        })
    }

    /// Read back normalized arguments recorded by the cache.
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}

impl From<ListArgs> for ListQuery {
    fn from(args: ListArgs) -> Self {
        Self {
            status: Some(args.status),
            page: Some(args.page),
            per_page: Some(args.per_page),
        }
    }
}

// ============================================================================
// ENVELOPES
// ============================================================================

/// Pagination block of a list response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: u64,
    pub per_page: u32,
    pub last_page: u32,
    pub current_page: u32,
}

impl Pagination {
    /// Compute pagination for `total` records.
    ///
    /// `last_page` is never below 1, and `current_page` is echoed back
    /// unclamped.
    pub fn compute(total: u64, per_page: u32, current_page: u32) -> Self {
        let per_page_wide = u64::from(per_page.max(1));
        let pages = total.div_ceil(per_page_wide).max(1);
        Self {
            total,
            per_page,
            last_page: u32::try_from(pages).unwrap_or(u32::MAX),
            current_page,
        }
    }

    /// Zero-based offset of the first record on the current page.
    pub fn offset(&self) -> u64 {
        u64::from(self.current_page.saturating_sub(1)) * u64::from(self.per_page)
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.last_page
    }

    pub fn has_prev(&self) -> bool {
        self.current_page > 1
    }
}

/// Metadata block shared by every response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    pub success: bool,
    #[serde(default)]
    pub errors: ErrorText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl Meta {
    pub fn ok() -> Self {
        Self {
            success: true,
            errors: ErrorText::default(),
            pagination: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            errors: ErrorText::One(message.into()),
            pagination: None,
        }
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }
}

/// Paginated list response: `{data: [...], meta: {..., pagination}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListPage<R> {
    #[serde(default = "Vec::new")]
    pub data: Vec<R>,
    pub meta: Meta,
}

impl<R> ListPage<R> {
    pub fn new(data: Vec<R>, pagination: Pagination) -> Self {
        Self {
            data,
            meta: Meta::ok().with_pagination(pagination),
        }
    }

    pub fn pagination(&self) -> Option<&Pagination> {
        self.meta.pagination.as_ref()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Single-record response: `{data?, meta}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    pub meta: Meta,
}

impl<T> Envelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            meta: Meta::ok(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            data: None,
            meta: Meta::failure(message),
        }
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
    fn test_list_query_resolves_defaults() {
        assert_eq!(ListQuery::new().resolve(), ListArgs::default());
        let args = ListQuery::page(3).with_per_page(10).resolve();
        assert_eq!(args.status, "ok");
        assert_eq!(args.page, 3);
        assert_eq!(args.per_page, 10);
    }

    #[test]
    fn test_list_query_omits_unset_fields() {
        let value = serde_json::to_value(ListQuery::page(2)).unwrap();
        assert_eq!(value, json!({"page": 2}));
    }

    #[test]
    fn test_list_args_value_roundtrip() {
        let args = ListArgs {
            status: "ok".into(),
            page: 2,
            per_page: 5,
        };
        assert_eq!(args.to_value(), json!({"status": "ok", "page": 2, "perPage": 5}));
        assert_eq!(ListArgs::from_value(&args.to_value()), Some(args));
    }

    #[test]
    fn test_pagination_math() {
        let p = Pagination::compute(12, 5, 1);
        assert_eq!(p.last_page, 3);
        assert!(p.has_next());
        assert!(!p.has_prev());

        let beyond = Pagination::compute(12, 5, 4);
        assert_eq!(beyond.current_page, 4);
        assert_eq!(beyond.last_page, 3);
        assert_eq!(beyond.offset(), 15);
    }

    #[test]
    fn test_pagination_empty_collection_has_one_page() {
        let p = Pagination::compute(0, 5, 1);
        assert_eq!(p.last_page, 1);
        assert!(!p.has_next());
    }

    #[test]
    fn test_list_page_wire_shape() {
        let page: ListPage<serde_json::Value> = serde_json::from_value(json!({
            "data": [],
            "meta": {
                "success": true,
                "errors": "",
                "pagination": {"total": 0, "perPage": 5, "lastPage": 1, "currentPage": 1}
            }
        }))
        .unwrap();
        assert!(page.is_empty());
        assert_eq!(page.pagination().map(|p| p.last_page), Some(1));
    }

    #[test]
    fn test_failure_envelope_has_no_data() {
        let env: Envelope<u8> = Envelope::failure("Item not found");
        let value = serde_json::to_value(&env).unwrap();
        assert_eq!(
            value,
            json!({"meta": {"success": false, "errors": "Item not found"}})
        );
    }

    fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Envelope<T> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_envelope_decodes_payload_without_default() {
        #[derive(Debug, PartialEq, Deserialize)]
        struct Named {
            name: String,
        }

        let failed: Envelope<Named> =
            decode(json!({"meta": {"success": false, "errors": "Item not found"}}));
        assert!(failed.data.is_none());
        assert!(!failed.meta.success);

        let ok: Envelope<Named> = decode(json!({
            "data": {"name": "Bolt"},
            "meta": {"success": true, "errors": ""}
        }));
        assert_eq!(ok.data, Some(Named { name: "Bolt".into() }));
    }
}
