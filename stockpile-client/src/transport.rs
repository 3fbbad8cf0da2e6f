//! HTTP transport adapter over `reqwest`.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use stockpile_core::{ApiError, Method, RequestDescriptor, Transport, TransportResult};
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// [`Transport`] that sends request descriptors to a REST backend.
#[derive(Debug, Clone)]
pub struct RestTransport {
    client: reqwest::Client,
    base_url: String,
    default_headers: HeaderMap,
}

impl RestTransport {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            default_headers: build_default_headers(config.api_key.as_deref())?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build(&self, request: &RequestDescriptor) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, request.url);
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .client
            .request(method, url)
            .headers(self.default_headers.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let pairs = request.query_pairs();
        if !pairs.is_empty() {
            builder = builder.query(&pairs);
        }
        if let Some(data) = &request.data {
            builder = builder.json(data);
        }
        builder
    }
}

#[async_trait]
impl Transport for RestTransport {
    async fn send(&self, request: RequestDescriptor) -> TransportResult {
        let response = match self.build(&request).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(method = %request.method, url = %request.url, error = %e, "request failed");
                return Err(ApiError::transport(e.to_string()));
            }
        };

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::transport(e.to_string()))?;
        let body = parse_body(&text);
        debug!(
            method = %request.method,
            url = %request.url,
            status = status.as_u16(),
            "response received"
        );

        if status.is_success() {
            return Ok(body.unwrap_or(Value::Null));
        }
        let fallback = format!("Request failed with status code {}", status.as_u16());
        Err(ApiError::from_response(status.as_u16(), body, &fallback))
    }
}

/// Empty bodies become `None`; non-JSON bodies are kept as text.
fn parse_body(text: &str) -> Option<Value> {
    if text.trim().is_empty() {
        return None;
    }
    Some(serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string())))
}

fn build_default_headers(api_key: Option<&str>) -> ClientResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    if let Some(api_key) = api_key {
        headers.insert(
            HeaderName::from_static("x-api-key"),
            HeaderValue::from_str(api_key).map_err(|e| ClientError::InvalidHeader {
                name: "x-api-key",
                reason: e.to_string(),
            })?,
        );
    }
    Ok(headers)
}
