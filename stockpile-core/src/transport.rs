//! Transport adapter contract.
//!
//! The cache and the mutation engine never talk HTTP directly. They hand a
//! [`RequestDescriptor`] to a [`Transport`] and get back either the response
//! body or a uniform [`ApiError`]. Any `Ok` is success; any `Err` is failure.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::ApiError;

/// Result of a transport call.
pub type TransportResult = Result<Value, ApiError>;

/// HTTP method of a request descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `{url, method, data?, params?, headers?}`
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub url: String,
    pub method: Method,
    pub data: Option<Value>,
    pub params: Option<Value>,
    pub headers: BTreeMap<String, String>,
}

impl RequestDescriptor {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            data: None,
            params: None,
            headers: BTreeMap::new(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>, data: Value) -> Self {
        Self::new(Method::Post, url).with_data(data)
    }

    pub fn put(url: impl Into<String>, data: Value) -> Self {
        Self::new(Method::Put, url).with_data(data)
    }

    pub fn patch(url: impl Into<String>, data: Value) -> Self {
        Self::new(Method::Patch, url).with_data(data)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::Delete, url)
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Query parameters rendered as string pairs, in key order.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let Some(Value::Object(params)) = &self.params else {
            return Vec::new();
        };
        let mut pairs: Vec<(String, String)> = params
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| {
                let rendered = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), rendered)
            })
            .collect();
        pairs.sort();
        pairs
    }
}

/// Adapter that executes request descriptors.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute `request`, resolving exactly once with the body or an error.
    async fn send(&self, request: RequestDescriptor) -> TransportResult;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: RequestDescriptor) -> TransportResult {
        (**self).send(request).await
    }
}
