//! API error types.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use tubely_metadata::MetadataError;
use tubely_storage::StorageError;

use crate::services::IngestError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Ingest(#[from] IngestError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),
}

impl ApiError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Map a multipart read failure; body-limit overflows become 413.
    pub fn multipart(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge(err.body_text())
        } else {
            Self::BadRequest(format!("Unable to parse form file: {}", err.body_text()))
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Ingest(e) => match e {
                IngestError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                IngestError::MissingContentType => StatusCode::BAD_REQUEST,
                IngestError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Metadata(MetadataError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) | ApiError::Storage(_) | ApiError::Metadata(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) | ApiError::Metadata(MetadataError::NotFound(_)) => "not_found",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::PayloadTooLarge(_) => "payload_too_large",
            ApiError::Internal(_) => "internal",
            ApiError::Ingest(e) => e.code(),
            ApiError::Storage(_) => "storage",
            ApiError::Metadata(_) => "metadata",
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
    code: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production
        let detail = if status.is_server_error()
            && std::env::var("ENVIRONMENT").unwrap_or_default() == "production"
        {
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            detail,
            code: self.code(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tubely_media::MediaError;

    #[test]
    fn test_ingest_status_mapping() {
        let cases = [
            (
                ApiError::from(IngestError::PayloadTooLarge { limit: 10 }),
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
            (
                ApiError::from(IngestError::MissingContentType),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::from(IngestError::UnsupportedMediaType("image/png".into())),
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ),
            (
                ApiError::from(IngestError::Classification(MediaError::FfprobeNotFound)),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ApiError::from(IngestError::Finalize(MetadataError::unavailable("x"))),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(err.status_code(), status, "{}", err);
        }
    }

    #[test]
    fn test_codes() {
        assert_eq!(ApiError::forbidden("x").code(), "forbidden");
        assert_eq!(
            ApiError::from(MetadataError::not_found("abc")).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(IngestError::Remux(MediaError::Timeout(1))).code(),
            "external_tool"
        );
    }

    #[test]
    fn test_client_error_detail_is_message() {
        assert_eq!(
            ApiError::bad_request("Title is required").to_string(),
            "Title is required"
        );
        assert_eq!(
            ApiError::not_found("Couldn't find video").to_string(),
            "Couldn't find video"
        );
    }

    #[test]
    fn test_detail_keeps_low_level_cause() {
        let err = ApiError::from(IngestError::Upload(StorageError::upload_failed(
            "connection reset",
        )));
        assert!(err.to_string().contains("connection reset"));
    }
}
