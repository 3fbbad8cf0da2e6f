//! Error types for Stockpile operations

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Error text as sent by the backend: a single string or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorText {
    One(String),
    Many(Vec<String>),
}

impl Default for ErrorText {
    fn default() -> Self {
        ErrorText::One(String::new())
    }
}

impl ErrorText {
    /// Join the messages with `", "`.
    pub fn joined(&self) -> String {
        match self {
            ErrorText::One(msg) => msg.clone(),
            ErrorText::Many(msgs) => msgs.join(", "),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ErrorText::One(msg) => msg.is_empty(),
            ErrorText::Many(msgs) => msgs.iter().all(String::is_empty),
        }
    }
}

impl From<&str> for ErrorText {
    fn from(msg: &str) -> Self {
        ErrorText::One(msg.to_string())
    }
}

impl From<String> for ErrorText {
    fn from(msg: String) -> Self {
        ErrorText::One(msg)
    }
}

/// Coarse classification of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No response was received.
    Transport,
    /// The backend rejected the payload (422).
    Validation,
    /// The addressed record does not exist (404).
    NotFound,
    /// Any other status.
    Other,
}

/// Uniform failure shape returned by every transport adapter.
///
/// Mirrors the adapter contract `{status?, data?, errors?}`: consumers only
/// distinguish "status present" from "status absent".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<ErrorText>,
}

impl ApiError {
    /// A failure with no response (network, timeout, decode).
    pub fn transport(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            status: None,
            data: Some(Value::String(message.clone())),
            errors: Some(ErrorText::One(message)),
        }
    }

    /// A failure carrying an HTTP status.
    pub fn with_status(status: u16, errors: impl Into<ErrorText>) -> Self {
        Self {
            status: Some(status),
            data: None,
            errors: Some(errors.into()),
        }
    }

    /// Build from an error response body, preferring `meta.errors`, then
    /// top-level `errors` or `error`, then `fallback`.
    pub fn from_response(status: u16, body: Option<Value>, fallback: &str) -> Self {
        let errors = body
            .as_ref()
            .and_then(extract_errors)
            .unwrap_or_else(|| ErrorText::One(fallback.to_string()));
        Self {
            status: Some(status),
            data: Some(body.unwrap_or_else(|| Value::String(fallback.to_string()))),
            errors: Some(errors),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self.status {
            None => ErrorKind::Transport,
            Some(422) => ErrorKind::Validation,
            Some(404) => ErrorKind::NotFound,
            Some(_) => ErrorKind::Other,
        }
    }

    /// Human readable message, if the error carries one.
    pub fn message(&self) -> Option<String> {
        self.errors
            .as_ref()
            .filter(|e| !e.is_empty())
            .map(ErrorText::joined)
    }
}

fn extract_errors(body: &Value) -> Option<ErrorText> {
    let candidate = body
        .get("meta")
        .and_then(|meta| meta.get("errors"))
        .or_else(|| body.get("errors"))
        .or_else(|| body.get("error"))?;
    serde_json::from_value::<ErrorText>(candidate.clone())
        .ok()
        .filter(|text| !text.is_empty())
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = self.message().unwrap_or_else(|| "unknown error".to_string());
        match self.status {
            Some(status) => write!(f, "[{}] {}", status, message),
            None => f.write_str(&message),
        }
    }
}

impl std::error::Error for ApiError {}

/// Errors surfaced by the mutation engine.
///
/// The cache has already been rolled back when one of these is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MutationError {
    #[error("Transport failure: {0}")]
    Transport(ApiError),

    #[error("Validation failed: {0}")]
    Validation(ApiError),

    #[error("Record not found: {0}")]
    NotFound(ApiError),

    #[error("Request rejected: {0}")]
    Rejected(ApiError),
}

impl MutationError {
    /// The underlying adapter error, for display.
    pub fn api_error(&self) -> &ApiError {
        match self {
            MutationError::Transport(e)
            | MutationError::Validation(e)
            | MutationError::NotFound(e)
            | MutationError::Rejected(e) => e,
        }
    }
}

impl From<ApiError> for MutationError {
    fn from(err: ApiError) -> Self {
        match err.kind() {
            ErrorKind::Transport => MutationError::Transport(err),
            ErrorKind::Validation => MutationError::Validation(err),
            ErrorKind::NotFound => MutationError::NotFound(err),
            ErrorKind::Other => MutationError::Rejected(err),
        }
    }
}

/// Fingerprinting errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FingerprintError {
    #[error("Arguments for {endpoint} cannot be serialized: {reason}")]
    Unserializable { endpoint: String, reason: String },
}

/// Master error type for all Stockpile errors.
#[derive(Debug, Clone, Error)]
pub enum StockpileError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Mutation error: {0}")]
    Mutation(#[from] MutationError),

    #[error("Fingerprint error: {0}")]
    Fingerprint(#[from] FingerprintError),
}

/// Result type alias for Stockpile operations.
pub type StockpileResult<T> = Result<T, StockpileError>;

// =============================================================================
// TESTS
// =============================================================================
