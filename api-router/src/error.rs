use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_typed_multipart::TypedMultipartError;
use common::error::AppError;
use serde::Serialize;
use thiserror::Error;

const UPLOAD_FAILED: &str = "Upload failed";

#[derive(Error, Debug, Serialize, Clone)]
pub enum ApiError {
    #[error("Internal server error")]
    InternalError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Validation(msg) => Self::ValidationError(msg),
            AppError::UpstreamStorage(source) => {
                tracing::error!(error = %source, "Object storage error");
                Self::InternalError("Internal server error".to_string())
            }
            other => {
                tracing::error!("Internal error: {:?}", other);
                Self::InternalError("Internal server error".to_string())
            }
        }
    }
}

impl From<TypedMultipartError> for ApiError {
    fn from(err: TypedMultipartError) -> Self {
        if err.get_status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge(err.to_string())
        } else {
            Self::ValidationError(format!("Invalid upload form: {err}"))
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match self {
            Self::InternalError(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new(message),
            ),
            Self::ValidationError(message) => (StatusCode::BAD_REQUEST, ErrorResponse::new(message)),
            Self::PayloadTooLarge(message) => {
                (StatusCode::PAYLOAD_TOO_LARGE, ErrorResponse::new(message))
            }
            Self::UploadFailed(details) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: UPLOAD_FAILED.to_string(),
                    details: Some(details),
                },
            ),
        };

        (status, Json(error_response)).into_response()
    }
}

#[derive(Serialize, Debug)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl ErrorResponse {
    fn new(error: String) -> Self {
        Self {
            error,
            details: None,
        }
    }
}
