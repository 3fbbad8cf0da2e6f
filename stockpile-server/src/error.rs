//! Error Types for the mock backend
//!
//! Every failure is rendered as the failure envelope
//! `{meta: {success: false, errors}}` with the matching HTTP status.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use stockpile_core::{ApiError, Envelope};
use thiserror::Error;

/// Backend errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServerError {
    /// Malformed request payload or parameters (422).
    #[error("{0}")]
    Validation(String),

    /// The addressed record does not exist (404).
    #[error("{0}")]
    NotFound(String),

    /// Invalid environment configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Seed loading, binding or serving failed.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for backend operations.
pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Config(_) | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The failure envelope sent to clients.
    pub fn envelope(&self) -> Envelope<()> {
        Envelope::failure(self.to_string())
    }

    /// The error a transport adapter would report for this response.
    pub fn to_api_error(&self) -> ApiError {
        let body = serde_json::to_value(self.envelope()).ok();
        ApiError::from_response(self.status_code().as_u16(), body, "Request failed")
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        if let ServerError::Config(_) | ServerError::Internal(_) = &self {
            tracing::error!(error = %self, "request failed");
        }
        (self.status_code(), Json(self.envelope())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockpile_core::ErrorKind;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ServerError::validation("Name is required").status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ServerError::not_found("Item not found").status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_envelope_carries_message() {
        let envelope = ServerError::validation("Invalid status param").envelope();
        let value = serde_json::to_value(envelope).unwrap();
        assert_eq!(value["meta"]["success"], serde_json::json!(false));
        assert_eq!(value["meta"]["errors"], serde_json::json!("Invalid status param"));
        assert!(value.get("data").is_none());
    }

    #[test]
    fn test_api_error_mirrors_response() {
        let err = ServerError::not_found("Item not found").to_api_error();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.message().as_deref(), Some("Item not found"));
    }
}
