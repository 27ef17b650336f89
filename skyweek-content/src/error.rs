//! Error types for skyweek-content
//!
//! `ContentError` is the resolver-level taxonomy. Component errors
//! (store, generation, chart) convert into it at the tier boundary:
//! transport failures become `RemoteUnavailable`, schema failures become
//! `MalformedResponse`, and the resolver treats both the same way.

use crate::services::ai_client::GenerationError;
use crate::services::chart_client::ChartError;
use crate::services::store_client::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Content resolution error
///
/// Cloneable so one in-flight outcome can be handed to every waiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContentError {
    /// Required subject data absent; not retried
    #[error("Missing input: {0}")]
    MissingInput(String),

    /// Network or HTTP failure, including timeouts
    #[error("Remote unavailable: {0}")]
    RemoteUnavailable(String),

    /// Payload failed schema validation
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Every tier failed, static tier included
    #[error("All content tiers exhausted: {0}")]
    Exhausted(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ContentError {
    /// Failures the resolver downgrades by falling to a lower tier
    pub fn triggers_fallback(&self) -> bool {
        matches!(
            self,
            ContentError::RemoteUnavailable(_)
                | ContentError::MalformedResponse(_)
                | ContentError::MissingInput(_)
                | ContentError::Internal(_)
        )
    }

    pub fn code(&self) -> &'static str {
        match self {
            ContentError::MissingInput(_) => "MISSING_INPUT",
            ContentError::RemoteUnavailable(_) => "REMOTE_UNAVAILABLE",
            ContentError::MalformedResponse(_) => "MALFORMED_RESPONSE",
            ContentError::Exhausted(_) => "CONTENT_EXHAUSTED",
            ContentError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<StoreError> for ContentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Parse(msg) => ContentError::MalformedResponse(msg),
            other => ContentError::RemoteUnavailable(other.to_string()),
        }
    }
}

impl From<GenerationError> for ContentError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::Parse(msg) => ContentError::MalformedResponse(msg),
            GenerationError::EmptyResponse => {
                ContentError::MalformedResponse("generation returned no content".to_string())
            }
            other => ContentError::RemoteUnavailable(other.to_string()),
        }
    }
}

impl From<ChartError> for ContentError {
    fn from(err: ChartError) -> Self {
        match err {
            ChartError::Parse(msg) => ContentError::MalformedResponse(msg),
            other => ContentError::RemoteUnavailable(other.to_string()),
        }
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Content resolution failure
    #[error(transparent)]
    Content(#[from] ContentError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Content(err) => {
                let status = match &err {
                    ContentError::MissingInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    ContentError::RemoteUnavailable(_) | ContentError::MalformedResponse(_) => {
                        StatusCode::BAD_GATEWAY
                    }
                    ContentError::Exhausted(_) | ContentError::Internal(_) => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, err.code(), err.to_string())
            }
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
