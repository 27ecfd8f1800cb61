//! HTTP error response mapping.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use safelabs_domain::error::{SafeLabsError, ValidationError};

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps [`SafeLabsError`] and malformed request bodies to an HTTP response
/// with appropriate status code.
#[derive(Debug)]
pub enum ApiError {
    Domain(SafeLabsError),
    /// The JSON body could not be read into the expected shape.
    BadBody(JsonRejection),
}

impl From<SafeLabsError> for ApiError {
    fn from(err: SafeLabsError) -> Self {
        Self::Domain(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::Domain(err.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadBody(rejection)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Domain(SafeLabsError::Validation(err)) => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            Self::BadBody(rejection) => (StatusCode::BAD_REQUEST, rejection.body_text()),
            Self::Domain(SafeLabsError::Storage(err)) => {
                tracing::error!(error = %err, "storage error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
