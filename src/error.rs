use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::models::MessageResponse;

/// StoreError
///
/// Failures raised by a `Repository` implementation. Kept separate from the
/// HTTP-facing `AppError` so the persistence layer never decides status codes.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error in {op}: {source}")]
    Database {
        op: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("a rule with section '{0}' already exists")]
    DuplicateSection(String),

    #[error("store unavailable")]
    Unavailable,
}

/// AppError
///
/// Every failure a handler can report. Each variant renders as
/// `{"message": "..."}` with its status; internal failures never leak their detail.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("store error: {0}")]
    Store(StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, AppError>;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateSection(section) => {
                AppError::Conflict(format!("a rule with section '{section}' already exists"))
            }
            other => AppError::Store(other),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> String {
        match self {
            AppError::InvalidRequest(msg) | AppError::NotFound(msg) | AppError::Conflict(msg) => {
                msg.clone()
            }
            AppError::Unauthorized => "Authentication required".to_string(),
            AppError::Forbidden => "Insufficient permissions".to_string(),
            AppError::Store(_) | AppError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            // The only place store faults are logged. Detail stays in the
            // logs; the client gets the generic body.
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }
        (status, Json(MessageResponse::new(self.public_message()))).into_response()
    }
}
