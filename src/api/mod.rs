//! HTTP surface: per-area axum routers composed in `main`.

pub mod devices;
pub mod history;
pub mod readings;
pub mod websocket;

use crate::search::SearchError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use tracing::error;

/// JSON error body shared by every endpoint.
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorResponse { error: message.into() })).into_response()
}

impl IntoResponse for SearchError {
    fn into_response(self) -> Response {
        match self {
            SearchError::InvalidDate(e) => {
                error_response(StatusCode::BAD_REQUEST, e.to_string())
            }
            SearchError::InvalidFilter(e) => {
                error_response(StatusCode::BAD_REQUEST, e.to_string())
            }
            SearchError::Storage(e) => {
                error!(error = %e, "Search query failed");
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "storage failure")
            }
        }
    }
}
