//! Mapping of registry failures to HTTP responses.
//!
//! Every failure is answered with a plain-text body holding the error
//! message. Caller-input errors are `400`, server-side faults `500`.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use shared::RegistryError;
use thiserror::Error;

/// Errors returned by the request handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The registry refused the operation.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The request body could not be decoded.
    #[error(transparent)]
    InvalidBody(#[from] JsonRejection),
}

impl ApiError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Registry(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            Self::Registry(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(%status, error = %self, "Request failed");
        } else {
            tracing::debug!(%status, error = %self, "Request rejected");
        }
        (status, self.to_string()).into_response()
    }
}
