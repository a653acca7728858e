//! HTTP error type for the REST service
//!
//! Every failure reaching a client is rendered as `{"detail": "<text>"}`
//! with the matching status code.

use crate::storage::StoreError;
use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    /// Request body or query failed validation
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unavailable(String),
    /// Rejected by an axum extractor before reaching a handler
    #[error("{detail}")]
    Rejected { status: StatusCode, detail: String },
    #[error("Database error: {context}")]
    Store {
        context: &'static str,
        #[source]
        source: StoreError,
    },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Rejected { status, .. } => *status,
            ApiError::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn conversation_not_found(id: i64) -> Self {
        ApiError::NotFound(format!("Conversation with ID {} not found", id))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Store { context, source } = &self {
            error!(error = %source, "{}", context);
        }
        let status = self.status();
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Rejected {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            detail: rejection.body_text(),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }
}

/// Attach a client-facing description to a storage failure
pub trait DbContext<T> {
    fn db_context(self, context: &'static str) -> Result<T, ApiError>;
}

impl<T> DbContext<T> for Result<T, StoreError> {
    fn db_context(self, context: &'static str) -> Result<T, ApiError> {
        self.map_err(|source| ApiError::Store { context, source })
    }
}
