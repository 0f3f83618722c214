use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

use crate::controllers::paste::PasteError;
use crate::types::api::ErrorBody;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ApiError {
    #[error("{0}")]
    Validation(PasteError),
    #[error("Paste not found")]
    PasteNotFound,
    #[error("Not found")]
    NoRoute,
    #[error("invalid request body: {source}")]
    Body {
        #[from]
        source: JsonRejection,
    },
    #[error("Failed to create paste")]
    Create { source: PasteError },
    #[error("Failed to fetch paste")]
    Fetch { source: PasteError },
}

impl ApiError {
    pub fn creating(source: PasteError) -> Self {
        match source {
            PasteError::Validation { .. } => ApiError::Validation(source),
            source => ApiError::Create { source },
        }
    }

    pub fn fetching(source: PasteError) -> Self {
        match source {
            PasteError::NotFound => ApiError::PasteNotFound,
            source => ApiError::Fetch { source },
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::PasteNotFound => StatusCode::NOT_FOUND,
            ApiError::NoRoute => StatusCode::NOT_FOUND,
            ApiError::Body { .. } => StatusCode::BAD_REQUEST,
            ApiError::Create { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Fetch { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();

        if let ApiError::Create { source } | ApiError::Fetch { source } = &self {
            error!("{self}: {source}");
        }

        let body = ErrorBody {
            error: self.to_string(),
        };
        (status_code, Json(body)).into_response()
    }
}
