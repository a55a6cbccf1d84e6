use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use booksync_core::{ErrorResponse, SyncError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed body, unknown action or bad locator
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Authentication(String),
    #[error("{0}")]
    Backend(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Authentication(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Backend(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<SyncError> for ApiError {
    fn from(error: SyncError) -> Self {
        if error.is_request_error() {
            return Self::BadRequest(error.to_string());
        }
        match error {
            SyncError::Authentication(message) => Self::Authentication(message),
            other => Self::Backend(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Sync request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "Sync request rejected");
        }
        (status, Json(ErrorResponse::new(&self))).into_response()
    }
}
