//! Error taxonomy shared by every Latch component

use thiserror::Error;

/// Result type for auth operations
pub type AuthResult<T> = Result<T, AuthError>;

/// Message returned for both an unknown account and a wrong password.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "invalid email or password";

/// Auth-specific errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown account or wrong password. The two cases are indistinguishable.
    #[error("{}", INVALID_CREDENTIALS_MESSAGE)]
    InvalidCredentials,

    /// Account exists but is deactivated
    #[error("account is inactive")]
    InactiveAccount,

    /// Expired, malformed, badly signed or wrongly typed token
    #[error("invalid token")]
    InvalidToken,

    /// Permission check failed
    #[error("insufficient permissions")]
    Unauthorized,

    /// Ownership or elevation check failed
    #[error("forbidden: {message}")]
    Forbidden { message: String },

    #[error("user not found: {user_id}")]
    UserNotFound { user_id: i32 },

    /// One or more permission ids did not resolve
    #[error("permission not found: {ids:?}")]
    PermissionNotFound { ids: Vec<i32> },

    /// One or more role ids did not resolve
    #[error("role not found: {ids:?}")]
    RoleNotFound { ids: Vec<i32> },

    /// One or more tenant ids did not resolve
    #[error("tenant not found: {ids:?}")]
    TenantNotFound { ids: Vec<i32> },

    #[error("page {page} is out of range")]
    PageOutOfRange { page: u64 },

    #[error("failed to parse key: {message}")]
    KeyParse { message: String },

    #[error("failed to hash password: {message}")]
    Hashing { message: String },

    #[error("failed to sign token: {message}")]
    Signing { message: String },

    /// Store failure inside a unit of work
    #[error("transaction failed: {message}")]
    Transaction { message: String },

    /// Store failure outside a unit of work
    #[error("repository error: {message}")]
    Repository { message: String },

    /// Business-rule validation failed
    #[error("validation error: {message}")]
    Validation { message: String },
}

impl AuthError {
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    pub fn key_parse(message: impl Into<String>) -> Self {
        Self::KeyParse {
            message: message.into(),
        }
    }

    pub fn hashing(message: impl Into<String>) -> Self {
        Self::Hashing {
            message: message.into(),
        }
    }

    pub fn signing(message: impl Into<String>) -> Self {
        Self::Signing {
            message: message.into(),
        }
    }

    pub fn transaction(message: impl Into<String>) -> Self {
        Self::Transaction {
            message: message.into(),
        }
    }

    pub fn repository(message: impl Into<String>) -> Self {
        Self::Repository {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Check if this error refers to a missing record
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UserNotFound { .. }
                | Self::PermissionNotFound { .. }
                | Self::RoleNotFound { .. }
                | Self::TenantNotFound { .. }
        )
    }

    /// Errors caused by the store rather than by the caller
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::KeyParse { .. }
                | Self::Hashing { .. }
                | Self::Signing { .. }
                | Self::Transaction { .. }
                | Self::Repository { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_credentials_message_is_generic() {
        let err = AuthError::InvalidCredentials;
        assert_eq!(err.to_string(), INVALID_CREDENTIALS_MESSAGE);
        assert!(!err.to_string().contains("not found"));
    }

    #[test]
    fn test_error_classification() {
        assert!(AuthError::UserNotFound { user_id: 1 }.is_not_found());
        assert!(AuthError::RoleNotFound { ids: vec![9] }.is_not_found());
        assert!(!AuthError::Unauthorized.is_not_found());
        assert!(AuthError::transaction("boom").is_internal());
        assert!(!AuthError::InvalidToken.is_internal());
    }
}
