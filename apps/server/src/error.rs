//! # API Errors
//!
//! Every failed request answers with the same envelope:
//!
//! ```json
//! { "status": "error", "code": "NOT_FOUND", "message": "Product not found: 7" }
//! ```
//!
//! | Source                          | Status | Code               |
//! |---------------------------------|--------|--------------------|
//! | Validation / cart rules         | 400    | `VALIDATION_ERROR` |
//! | Malformed body or query string  | 400    | `BAD_REQUEST`      |
//! | Unknown product, cart, line     | 404    | `NOT_FOUND`        |
//! | Product id that is not a number | 404    | `NOT_FOUND`        |
//! | Persist timed out               | 500    | `TRANSIENT_ERROR`  |
//! | Any other storage failure       | 500    | `PERSISTENCE_ERROR`|

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use storefront_core::ValidationError;
use storefront_db::DbError;
use tracing::error;

pub type ApiResult<T> = Result<T, ApiError>;

/// An HTTP error response.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    status: &'static str,
    code: &'a str,
    message: &'a str,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        ApiError {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    /// A path segment that cannot name any product (`/api/products/abc`)
    /// is treated as an unknown product.
    pub fn unknown_product(rejection: PathRejection) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("Product not found: {}", rejection.body_text()),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            status: "error",
            code: self.code,
            message: &self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        if err.is_not_found() {
            return ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string());
        }
        if err.is_validation() {
            return ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", err.to_string());
        }

        error!(error = %err, retryable = err.is_retryable(), "Storage failure");
        if err.is_retryable() {
            ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "TRANSIENT_ERROR",
                err.to_string(),
            )
        } else {
            ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "PERSISTENCE_ERROR",
                err.to_string(),
            )
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use storefront_core::CoreError;

    #[test]
    fn test_db_error_mapping() {
        let not_found: ApiError = DbError::not_found("Product", 7).into();
        assert_eq!(not_found.status, StatusCode::NOT_FOUND);
        assert_eq!(not_found.code, "NOT_FOUND");
        assert_eq!(not_found.message, "Product not found: 7");

        let invalid: ApiError = DbError::from(ValidationError::MustBePositive {
            field: "price".into(),
        })
        .into();
        assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
        assert_eq!(invalid.code, "VALIDATION_ERROR");

        let too_large: ApiError = DbError::from(CoreError::CartTooLarge { max: 100 }).into();
        assert_eq!(too_large.status, StatusCode::BAD_REQUEST);

        let timeout: ApiError = DbError::Timeout {
            operation: "create product",
            after: Duration::from_secs(5),
        }
        .into();
        assert_eq!(timeout.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(timeout.code, "TRANSIENT_ERROR");

        let disk: ApiError = DbError::Persistence("disk full".into()).into();
        assert_eq!(disk.code, "PERSISTENCE_ERROR");
    }
}
