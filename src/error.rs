// error.rs
// Error taxonomy for the ledger core, mapped to JSON error responses.
// Every failure either fully applies or not at all; nothing is retried.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed input, rejected before any mutation.
    #[error("{0}")]
    Validation(String),

    /// No record matches the id/owner pair.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The record exists but its lifecycle forbids the operation.
    #[error("{0}")]
    InvalidState(String),

    /// Store-level uniqueness violation (e.g. phone reused per owner).
    #[error("{0} already exists")]
    Duplicate(&'static str),

    /// A concurrent write invalidated the amounts read for this mutation.
    #[error("record was modified concurrently, retry the payment")]
    Conflict,

    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),
}

/// MongoDB E11000 duplicate-key errors become `Duplicate`; everything else
/// stays a `Database` error.
pub fn map_write_error(err: mongodb::error::Error, entity: &'static str) -> ApiError {
    use mongodb::error::{ErrorKind, WriteFailure};
    if let ErrorKind::Write(WriteFailure::WriteError(ref write_err)) = *err.kind {
        if write_err.code == 11000 {
            return ApiError::Duplicate(entity);
        }
    }
    ApiError::Database(err)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(_) | ApiError::InvalidState(_) | ApiError::Duplicate(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict => StatusCode::CONFLICT,
            ApiError::Database(err) => {
                tracing::error!(error = %err, "database failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let message = match &self {
            ApiError::Database(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        (
            status,
            Json(json!({ "success": false, "message": message })),
        )
            .into_response()
    }
}
