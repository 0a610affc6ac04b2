//! Application error type
//!
//! Maps storage, serialization and lookup failures to HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::validation::FormErrors;

/// The error type returned by database operations and request handlers.
#[derive(Error, Debug)]
pub enum AppError {
    /// Primary-key or slug lookup missed (e.g. "article 12")
    #[error("{0} not found")]
    NotFound(String),

    /// User input failed a field or cross-record rule
    #[error("validation error: {0}")]
    Validation(FormErrors),

    /// Embedded database failure
    #[error("storage error: {0}")]
    Storage(#[from] redb::Error),

    /// A stored record could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A specialized Result type for blog operations.
pub type Result<T> = std::result::Result<T, AppError>;

// redb reports each stage of a transaction with its own error type.
macro_rules! storage_error {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for AppError {
                fn from(err: $ty) -> Self {
                    AppError::Storage(err.into())
                }
            }
        )*
    };
}

storage_error!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", self.to_string()),
            AppError::Validation(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "invalid", self.to_string())
            }
            AppError::Storage(_) | AppError::Serialization(_) => {
                tracing::error!(error = %self, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal",
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message, "code": code }))).into_response()
    }
}
