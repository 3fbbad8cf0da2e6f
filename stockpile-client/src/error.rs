//! Client error types and user-facing message rendering.

use stockpile_core::{ApiError, MutationError, StockpileError};

use crate::config::ConfigError;

/// Shown when an error carries no message of its own.
pub const GENERIC_ERROR_MESSAGE: &str = "Unknown error";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid header {name}: {reason}")]
    InvalidHeader { name: &'static str, reason: String },
    #[error(transparent)]
    Stockpile(#[from] StockpileError),
}

impl From<ApiError> for ClientError {
    fn from(err: ApiError) -> Self {
        Self::Stockpile(StockpileError::Api(err))
    }
}

impl From<MutationError> for ClientError {
    fn from(err: MutationError) -> Self {
        Self::Stockpile(StockpileError::Mutation(err))
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Inline message for an adapter error: its error texts joined with
/// `", "`, else a textual body, else [`GENERIC_ERROR_MESSAGE`].
pub fn error_message(error: &ApiError) -> String {
    if let Some(message) = error.message() {
        return message;
    }
    match &error.data {
        Some(serde_json::Value::String(text)) if !text.is_empty() => text.clone(),
        _ => GENERIC_ERROR_MESSAGE.to_string(),
    }
}
