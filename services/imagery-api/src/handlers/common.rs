//! Shared response helpers.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use metrics::counter;
use serde::Serialize;
use tracing::{error, warn};

use imagery_common::ImageryError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

/// JSON error response carrying the error's status code.
pub fn error_response(err: &ImageryError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    counter!("imagery_request_errors_total", "kind" => err.kind()).increment(1);
    if status.is_server_error() {
        error!(error = %err, "Request failed");
    } else {
        warn!(error = %err, "Rejected request");
    }

    let body = ErrorBody {
        error: err.kind(),
        message: err.to_string(),
    };
    (status, Json(body)).into_response()
}

/// Fallback for methods other than GET.
pub async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "GET")],
        "MethodNotAllowed",
    )
        .into_response()
}
