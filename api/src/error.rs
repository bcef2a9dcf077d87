/// HTTP error responses.
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use tubeclip_shared::errors::ToolError;
use tubeclip_shared::models::ErrorBody;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Log the tool failure and answer with a generic 500 carrying `message`.
pub fn execution_failed(message: &'static str) -> impl FnOnce(ToolError) -> ApiError {
    move |e| {
        error!("{}: {}", message, e);
        ApiError::internal(message)
    }
}
