use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::services::query_analyzer::AnalyzerError;

/// API Error with rich context and automatic error trait implementations
///
/// Each variant carries meaningful context to help with debugging.
#[derive(Error, Debug)]
pub enum ApiError {
    // Resource errors 3xxx
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Query {query_id} not found")]
    QueryNotFound { query_id: String },

    // Validation errors 4xxx
    #[error("Validation error on `{field}`: {detail}")]
    ValidationError { field: String, detail: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // System errors 5xxx
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ApiError {
    /// Helper to create query not found error
    pub fn query_not_found(query_id: impl Into<String>) -> Self {
        Self::QueryNotFound { query_id: query_id.into() }
    }

    /// Helper to create invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Get error code
    pub fn error_code(&self) -> i32 {
        match self {
            // Resource errors 3xxx
            Self::ResourceNotFound(_) => 3000,
            Self::QueryNotFound { .. } => 3001,

            // Validation errors 4xxx
            Self::ValidationError { .. } => 4001,
            Self::InvalidInput(_) => 4002,

            // System errors 5xxx
            Self::InternalError(_) => 5001,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.error_code() {
            3000..=3999 => StatusCode::NOT_FOUND,
            4001..=4999 => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error body returned by every endpoint
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiErrorResponse {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let details = match &self {
            Self::ValidationError { field, .. } => Some(serde_json::json!({ "field": field })),
            _ => None,
        };

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        let response = ApiErrorResponse { code: self.error_code(), message: self.to_string(), details };

        (status, Json(response)).into_response()
    }
}

impl From<AnalyzerError> for ApiError {
    fn from(err: AnalyzerError) -> Self {
        match err {
            AnalyzerError::Validation { field, detail } => Self::ValidationError { field, detail },
            AnalyzerError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Self::ResourceNotFound(format!("query log: {e}"))
            },
            AnalyzerError::Io(e) => Self::InternalError(format!("Failed to read query log: {e}")),
            AnalyzerError::Csv(e) => Self::InvalidInput(format!("Malformed CSV: {e}")),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
