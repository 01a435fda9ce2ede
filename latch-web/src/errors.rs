//! HTTP error type and the mapping from auth errors to status codes

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use latch_core::AuthError;

/// Web-specific error type for HTTP API operations
#[derive(Debug, Error)]
pub enum WebError {
    #[error("{message}")]
    BadRequest { message: String },

    #[error("{message}")]
    Unauthorized { message: String },

    #[error("{message}")]
    Forbidden { message: String },

    #[error("{message}")]
    NotFound { message: String },

    #[error("Too many login attempts, retry in {retry_after_secs}s")]
    RateLimit { retry_after_secs: u64 },

    #[error("{message}")]
    ServiceUnavailable { message: String },

    #[error("{message}")]
    Internal { message: String },
}

/// Result type for web operations
pub type WebResult<T> = Result<T, WebError>;

impl WebError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            WebError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            WebError::Forbidden { .. } => StatusCode::FORBIDDEN,
            WebError::NotFound { .. } => StatusCode::NOT_FOUND,
            WebError::RateLimit { .. } => StatusCode::TOO_MANY_REQUESTS,
            WebError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            WebError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            WebError::BadRequest { .. } => "BAD_REQUEST",
            WebError::Unauthorized { .. } => "UNAUTHORIZED",
            WebError::Forbidden { .. } => "FORBIDDEN",
            WebError::NotFound { .. } => "NOT_FOUND",
            WebError::RateLimit { .. } => "RATE_LIMITED",
            WebError::ServiceUnavailable { .. } => "SERVICE_UNAVAILABLE",
            WebError::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

impl From<AuthError> for WebError {
    fn from(err: AuthError) -> Self {
        let message = err.to_string();
        match err {
            AuthError::InvalidCredentials
            | AuthError::InactiveAccount
            | AuthError::InvalidToken
            | AuthError::Unauthorized => WebError::Unauthorized { message },
            AuthError::Forbidden { .. } => WebError::Forbidden { message },
            AuthError::UserNotFound { .. }
            | AuthError::PermissionNotFound { .. }
            | AuthError::RoleNotFound { .. }
            | AuthError::TenantNotFound { .. } => WebError::NotFound { message },
            AuthError::PageOutOfRange { .. } | AuthError::Validation { .. } => {
                WebError::BadRequest { message }
            }
            AuthError::KeyParse { .. }
            | AuthError::Hashing { .. }
            | AuthError::Signing { .. }
            | AuthError::Transaction { .. }
            | AuthError::Repository { .. } => WebError::Internal { message },
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Internal details go to the log, never to the client
        let message = match &self {
            WebError::Internal { message } => {
                error!("Internal error: {}", message);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "error": {
                "code": self.error_code(),
                "message": message,
            }
        });

        let mut response = (status, Json(body)).into_response();
        if let WebError::RateLimit { retry_after_secs } = self {
            if let Ok(value) = retry_after_secs.to_string().parse() {
                response
                    .headers_mut()
                    .insert(axum::http::header::RETRY_AFTER, value);
            }
        }
        response
    }
}
