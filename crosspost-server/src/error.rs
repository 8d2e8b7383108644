//! HTTP error mapping for the crosspost API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use libcrosspost::CrosspostError;
use serde_json::json;
use tracing::error;

/// Wrapper turning library errors into JSON error responses.
pub struct ApiError(pub CrosspostError);

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            CrosspostError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            CrosspostError::Authentication(_) => StatusCode::UNAUTHORIZED,
            CrosspostError::Authorization(_) => StatusCode::FORBIDDEN,
            CrosspostError::NotFound(_) => StatusCode::NOT_FOUND,
            CrosspostError::Conflict(_) => StatusCode::CONFLICT,
            CrosspostError::Delivery(_) => StatusCode::BAD_GATEWAY,
            CrosspostError::Config(_) | CrosspostError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Internal details stay in the logs, not the response body.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self.0, "Internal error serving request");
            "internal server error".to_string()
        } else {
            self.0.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<CrosspostError> for ApiError {
    fn from(err: CrosspostError) -> Self {
        Self(err)
    }
}
