//! Request-boundary access check

use std::sync::Arc;
use tracing::{debug, warn};

use latch_core::{authorize, AuthError, AuthResult, Claims, PermissionCode};

use crate::token::TokenCodec;

/// Verifies a presented token and checks it against the permissions a route
/// requires.
#[derive(Debug, Clone)]
pub struct AccessGuard {
    codec: Arc<TokenCodec>,
}

impl AccessGuard {
    pub fn new(codec: Arc<TokenCodec>) -> Self {
        Self { codec }
    }

    /// Verify `raw_auth_value` (a bearer header value or a bare token) and
    /// authorize it for `required`.
    pub fn guard(&self, raw_auth_value: &str, required: &[PermissionCode]) -> AuthResult<Claims> {
        let claims = self.codec.verify(raw_auth_value)?;
        if let Err(err) = authorize(&claims, required) {
            warn!(
                "Access denied for subject {} ({}), required any of {:?}",
                claims.sub,
                claims.token_type.as_str(),
                required
            );
            return Err(err);
        }
        debug!("Access granted for subject {}", claims.sub);
        Ok(claims)
    }

    /// Guard using the `Authorization` header when present, else the
    /// `access_token` cookie.
    pub fn guard_request(
        &self,
        authorization: Option<&str>,
        access_cookie: Option<&str>,
        required: &[PermissionCode],
    ) -> AuthResult<Claims> {
        let raw = select_credential(authorization, access_cookie).ok_or(AuthError::InvalidToken)?;
        self.guard(raw, required)
    }
}

/// Header takes precedence over the cookie. Blank values count as absent.
pub fn select_credential<'a>(
    authorization: Option<&'a str>,
    access_cookie: Option<&'a str>,
) -> Option<&'a str> {
    authorization
        .filter(|value| !value.trim().is_empty())
        .or_else(|| access_cookie.filter(|value| !value.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::test_support::{claims, codec, other_codec};
    use latch_core::TokenType;

    fn guard() -> AccessGuard {
        AccessGuard::new(Arc::new(codec()))
    }

    #[test]
    fn test_guard_allows_matching_permission() {
        let token = codec().sign(&claims(TokenType::Access, &["view_user"])).unwrap();
        let result = guard().guard(
            &format!("Bearer {}", token),
            &[PermissionCode::ViewUser, PermissionCode::CreateUser],
        );
        assert_eq!(result.unwrap().sub, "7");
    }

    #[test]
    fn test_guard_rejects_missing_permission() {
        let token = codec().sign(&claims(TokenType::Access, &["view_user"])).unwrap();
        assert_eq!(
            guard().guard(&token, &[PermissionCode::CreateRole]),
            Err(AuthError::Unauthorized)
        );
    }

    #[test]
    fn test_guard_rejects_refresh_token() {
        let token = codec().sign(&claims(TokenType::Refresh, &["view_user"])).unwrap();
        assert_eq!(guard().guard(&token, &[]), Err(AuthError::Unauthorized));
    }

    #[test]
    fn test_guard_rejects_foreign_token() {
        let token = other_codec().sign(&claims(TokenType::Access, &[])).unwrap();
        assert_eq!(guard().guard(&token, &[]), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_header_takes_precedence_over_cookie() {
        let good = codec().sign(&claims(TokenType::Access, &[])).unwrap();
        let bad = other_codec().sign(&claims(TokenType::Access, &[])).unwrap();
        let header = format!("Bearer {}", bad);

        assert_eq!(
            guard().guard_request(Some(&header), Some(&good), &[]),
            Err(AuthError::InvalidToken)
        );
        assert!(guard().guard_request(None, Some(&good), &[]).is_ok());
        assert!(guard().guard_request(Some("  "), Some(&good), &[]).is_ok());
        assert_eq!(
            guard().guard_request(None, None, &[]),
            Err(AuthError::InvalidToken)
        );
    }
}
