//! Mapping of data-layer errors onto HTTP responses.

use axum::Json;
use axum::http::header::WWW_AUTHENTICATE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use quizbank_core::{DataError, FieldErrors, StoreError};

const REALM: &str = "Basic realm=\"quizbank\"";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Data(#[from] DataError),

    /// Request could not be decoded (bad JSON, bad multipart).
    #[error("malformed request: {0}")]
    Malformed(FieldErrors),

    #[error("unauthorized")]
    Unauthorized,
}

impl ApiError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(FieldErrors::non_field(message))
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Data(DataError::Store(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Data(err) if err.is_not_found() => {
                tracing::debug!("{err}");
                StatusCode::NOT_FOUND.into_response()
            }
            ApiError::Data(DataError::MissingFilters) => (
                StatusCode::BAD_REQUEST,
                Json(FieldErrors::non_field("Missing arguments")),
            )
                .into_response(),
            ApiError::Data(DataError::Validation(errors)) | ApiError::Malformed(errors) => {
                (StatusCode::BAD_REQUEST, Json(errors)).into_response()
            }
            ApiError::Data(err) => {
                tracing::error!("data store failure: {err}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            ApiError::Unauthorized => {
                let mut response = StatusCode::UNAUTHORIZED.into_response();
                response
                    .headers_mut()
                    .insert(WWW_AUTHENTICATE, HeaderValue::from_static(REALM));
                response
            }
        }
    }
}
