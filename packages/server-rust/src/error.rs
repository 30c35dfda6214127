//! Error type returned by HTTP handlers and extractors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::backend::BackendError;

/// Handler-facing error, rendered as `{"error": "<message>"}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("authentication required")]
    Unauthenticated,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("identity service unavailable")]
    BackendUnavailable,
    #[error("session layer not installed")]
    SessionLayerMissing,
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::BackendUnavailable => StatusCode::BAD_GATEWAY,
            ApiError::SessionLayerMissing => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<BackendError> for ApiError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Rejected { status, .. } if status < 500 => ApiError::InvalidCredentials,
            BackendError::Rejected { .. }
            | BackendError::Transport(_)
            | BackendError::InvalidResponse(_) => {
                tracing::warn!(error = %err, "identity service call failed");
                ApiError::BackendUnavailable
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if matches!(self, ApiError::SessionLayerMissing) {
            tracing::error!("handler requires the session layer but it is not installed");
        }
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
