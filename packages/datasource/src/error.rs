//! Application-level error type returned by handlers.
//!
//! Every variant serialises to the [`ErrorResponse`] JSON body. Query
//! failures never surface here: they travel inside the per-RefID
//! responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use piweb_api::error::{codes, ErrorResponse};

#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, codes::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, codes::INVALID_JSON, msg),
        };
        (status, Json(ErrorResponse::new(code, message))).into_response()
    }
}
