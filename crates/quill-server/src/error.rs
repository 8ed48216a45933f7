//! HTTP mapping for the shared error taxonomy.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use quill_core::{ErrorBody, QuillError};

/// A [`QuillError`] leaving the server as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub QuillError);

impl From<QuillError> for ApiError {
    fn from(err: QuillError) -> Self {
        Self(err)
    }
}

/// Status for a machine-readable error code.
#[must_use]
pub fn status_for(code: &str) -> StatusCode {
    match code {
        "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
        "NOT_FOUND" => StatusCode::NOT_FOUND,
        "CONFLICT" => StatusCode::CONFLICT,
        "RANGE_ERROR" | "UNSUPPORTED_KIND" => StatusCode::UNPROCESSABLE_ENTITY,
        "TIMEOUT" => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(self.0.code());
        (status, Json(ErrorBody::from(&self.0))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_map_to_the_documented_statuses() {
        assert_eq!(status_for("VALIDATION_ERROR"), StatusCode::BAD_REQUEST);
        assert_eq!(status_for("NOT_FOUND"), StatusCode::NOT_FOUND);
        assert_eq!(status_for("CONFLICT"), StatusCode::CONFLICT);
        assert_eq!(status_for("RANGE_ERROR"), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            status_for("UNSUPPORTED_KIND"),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(status_for("TIMEOUT"), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            status_for("INTERNAL_ERROR"),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn response_body_carries_code_and_message() {
        let err = ApiError(QuillError::not_found("p-0.3"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
