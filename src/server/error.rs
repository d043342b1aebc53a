// server/error.rs
//! HTTP error responses
//!
//! Every failure is answered with `{"error": "<message>"}`. Server-side failures are logged with
//! their full cause before the response is built.

use std::io;

use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{
        IntoResponse,
        Response,
    },
};
use serde::Serialize;
use thiserror::Error;
use tracing::{
    error,
    warn,
};

use crate::storage::StorageError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No file uploaded")]
    NoFile,

    #[error("Unexpected field: {0}")]
    UnexpectedField(String),

    #[error("Invalid file type. Only {0} files are allowed.")]
    InvalidType(&'static str),

    #[error("File too large")]
    TooLarge,

    #[error("{0}")]
    BadRequest(String),

    #[error("Unable to read music directory")]
    ListFailed(#[source] io::Error),

    #[error("Failed to store upload")]
    Storage(#[source] StorageError),

    #[error("Unable to read file")]
    ReadFailed(#[source] io::Error),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            | Self::NoFile | Self::UnexpectedField(_) | Self::InvalidType(_) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            },
            | Self::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            | Self::ListFailed(_) | Self::Storage(_) | Self::ReadFailed(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
        }
    }

    /// Maps a multipart read failure, keeping body limit hits distinct from malformed bodies
    pub fn from_multipart(e: MultipartError) -> Self {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::TooLarge
        } else {
            Self::BadRequest(e.body_text())
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            | StorageError::TooLarge { .. } => Self::TooLarge,
            | e => Self::Storage(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            match std::error::Error::source(&self) {
                | Some(cause) => error!("{self}: {cause}"),
                | None => error!("{self}"),
            }
        } else {
            warn!("Rejected request: {self}");
        }

        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn statuses() {
        assert_eq!(ApiError::NoFile.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::TooLarge.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            ApiError::ListFailed(io::ErrorKind::NotFound.into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn messages() {
        assert_eq!(ApiError::NoFile.to_string(), "No file uploaded");
        assert_eq!(
            ApiError::InvalidType("MP3/WAV").to_string(),
            "Invalid file type. Only MP3/WAV files are allowed."
        );
        assert_eq!(
            ApiError::ListFailed(io::ErrorKind::PermissionDenied.into()).to_string(),
            "Unable to read music directory"
        );
    }

    #[tokio::test]
    async fn read_failures_render_json() {
        let res = ApiError::ReadFailed(io::ErrorKind::Other.into()).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"], "Unable to read file");
    }

    #[test]
    fn storage_limit_becomes_too_large() {
        let e = ApiError::from(StorageError::TooLarge { limit: 1 });
        assert!(matches!(e, ApiError::TooLarge));

        let e = ApiError::from(StorageError::NamesExhausted(8));
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(e.to_string(), "Failed to store upload");
    }
}
