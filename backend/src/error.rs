//! API error type and its JSON body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use capryos_shared::site::{SiteError, GENERIC_FAILURE};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Unavailable(String),
    /// `message` is what the client sees; `source` only goes to the log.
    #[error("{message}")]
    Internal {
        message: String,
        source: anyhow::Error,
    },
}

impl ApiError {
    pub fn internal(message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Internal {
            message: message.into(),
            source: source.into(),
        }
    }

    /// Map a site failure, answering unexpected ones with `generic`.
    pub fn from_site(err: SiteError, generic: &str) -> Self {
        match err {
            SiteError::Invalid(message) => Self::BadRequest(message),
            SiteError::PostNotFound | SiteError::NotFound { .. } => {
                Self::NotFound(err.to_string())
            },
            SiteError::AlreadySubscribed | SiteError::DuplicateSlug(_) => {
                Self::Conflict(err.to_string())
            },
            SiteError::Store(source) => Self::internal(generic, source),
        }
    }

    fn code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            Self::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
            Self::Internal { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl From<SiteError> for ApiError {
    fn from(err: SiteError) -> Self {
        Self::from_site(err, GENERIC_FAILURE)
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = self.code();
        match &self {
            Self::Internal { message, source } => {
                tracing::error!(error = ?source, "{message}");
            },
            Self::Unavailable(message) => tracing::warn!("{message}"),
            other => tracing::debug!(status = status.as_u16(), "{other}"),
        }

        let body = ErrorResponse {
            error,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
