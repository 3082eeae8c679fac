//! Handler error type and its HTML error page.

use crate::handlers::html::{escape, page};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use invoicer_database::DbError;

/// Storage failure recorded on an error response for the recovery layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageFailure {
    /// The tenant database is missing, corrupt or otherwise unusable.
    Operational,
    /// The tenant database has reached its size ceiling.
    LimitExceeded,
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("database error: {0}")]
    Database(#[from] DbError),

    #[error("core error: {0}")]
    Core(#[from] invoicer_core::Error),

    #[error("signer error: {0}")]
    Signer(#[from] invoicer_signer::SignerError),
}

impl ApiError {
    /// Get the error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::BadRequest(_) => "bad_request",
            Self::Database(e) => match e {
                DbError::NotFound(_) => "not_found",
                DbError::LimitExceeded { .. } => "limit_exceeded",
                DbError::Unsupported(_) => "unsupported_operation",
                DbError::MissingTenant => "missing_tenant",
                e if e.is_busy() => "database_busy",
                e if e.is_constraint_violation() => "conflict",
                _ => "database_error",
            },
            Self::Core(_) => "invalid_input",
            Self::Signer(_) => "signer_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Database(e) => match e {
                DbError::NotFound(_) => StatusCode::NOT_FOUND,
                DbError::LimitExceeded { .. } => StatusCode::INSUFFICIENT_STORAGE,
                e if e.is_busy() => StatusCode::SERVICE_UNAVAILABLE,
                e if e.is_constraint_violation() => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Core(_) => StatusCode::BAD_REQUEST,
            Self::Signer(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Classify storage failures the recovery layer can act on.
    pub fn storage_failure(&self) -> Option<StorageFailure> {
        match self {
            Self::Database(DbError::LimitExceeded { .. }) => Some(StorageFailure::LimitExceeded),
            Self::Database(e) if e.is_operational() => Some(StorageFailure::Operational),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let failure = self.storage_failure();
        if status.is_server_error() && failure.is_none() {
            tracing::error!(error = %self, "Request failed");
        }
        let title = status.canonical_reason().unwrap_or("Error");
        let body = format!(
            "<h1>{}</h1>\n<p class=\"error\" data-code=\"{}\">{}</p>\n<p><a href=\"/\">Back to projects</a></p>",
            escape(title),
            self.code(),
            escape(&self.to_string())
        );
        let mut response = (status, page(title, &body)).into_response();
        if let Some(failure) = failure {
            response.extensions_mut().insert(failure);
        }
        response
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
