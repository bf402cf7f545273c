//! REST route tree.

pub mod flows;

use axum::http::StatusCode;
use axum::{Json, Router};

use crate::state::AppState;

/// Builds the `/controller` router.
pub fn router() -> Router<AppState> {
    Router::new().nest("/controller", flows::router())
}

/// An error a handler turns into an HTTP status and a JSON body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}
