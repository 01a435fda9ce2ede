//! Token claims and the permission evaluator

use serde::{Deserialize, Serialize};

use crate::error::{AuthError, AuthResult};
use crate::models::User;
use crate::permissions::PermissionCode;

/// Discriminates access tokens from refresh tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenType {
    #[serde(rename = "access_token")]
    Access,
    #[serde(rename = "refresh_token")]
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access_token",
            TokenType::Refresh => "refresh_token",
        }
    }
}

/// Signed token payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "isSuperUser", default)]
    pub is_super_user: bool,
    /// Flattened permission codes of the user's roles
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenants: Option<Vec<i32>>,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    /// Issuer
    pub iss: String,
    /// Issued at
    pub iat: i64,
    /// Expiration time
    pub exp: i64,
}

impl Claims {
    /// Build claims for a hydrated user
    pub fn for_user(
        user: &User,
        token_type: TokenType,
        issuer: impl Into<String>,
        issued_at: i64,
        expires_at: i64,
    ) -> Self {
        let tenants = user.tenant_ids();
        Self {
            sub: user.id.to_string(),
            email: Some(user.email.clone()),
            is_super_user: user.is_super_user,
            permissions: user.permission_codes(),
            tenants: (!tenants.is_empty()).then_some(tenants),
            token_type,
            iss: issuer.into(),
            iat: issued_at,
            exp: expires_at,
        }
    }

    /// Subject parsed back into a user id
    pub fn subject_id(&self) -> AuthResult<i32> {
        self.sub.parse().map_err(|_| AuthError::InvalidToken)
    }

    pub fn has_permission(&self, code: PermissionCode) -> bool {
        self.permissions.iter().any(|held| held == code.as_str())
    }

    pub fn is_refresh(&self) -> bool {
        self.token_type == TokenType::Refresh
    }
}

/// Decide whether `claims` may perform an action guarded by `required`.
///
/// Refresh tokens authorize nothing. Super-users bypass every check. An empty
/// requirement only needs a valid access token. Otherwise holding any one of
/// the required permissions is enough.
pub fn authorize(claims: &Claims, required: &[PermissionCode]) -> AuthResult<()> {
    if claims.is_refresh() {
        return Err(AuthError::Unauthorized);
    }
    if claims.is_super_user || required.is_empty() {
        return Ok(());
    }
    if required.iter().any(|code| claims.has_permission(*code)) {
        Ok(())
    } else {
        Err(AuthError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{permission, role, user};

    fn claims(token_type: TokenType, is_super_user: bool, permissions: &[&str]) -> Claims {
        Claims {
            sub: "1".to_string(),
            email: None,
            is_super_user,
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
            tenants: None,
            token_type,
            iss: "latch".to_string(),
            iat: 0,
            exp: i64::MAX,
        }
    }

    #[test]
    fn test_refresh_token_never_authorizes() {
        let refresh = claims(TokenType::Refresh, true, &["create_user"]);
        assert_eq!(authorize(&refresh, &[]), Err(AuthError::Unauthorized));
        assert_eq!(
            authorize(&refresh, &[PermissionCode::CreateUser]),
            Err(AuthError::Unauthorized)
        );
    }

    #[test]
    fn test_super_user_bypasses_permissions() {
        let admin = claims(TokenType::Access, true, &[]);
        assert!(authorize(&admin, &[PermissionCode::UpdateRole]).is_ok());
    }

    #[test]
    fn test_empty_requirement_allows_any_access_token() {
        let plain = claims(TokenType::Access, false, &[]);
        assert!(authorize(&plain, &[]).is_ok());
    }

    #[test]
    fn test_any_required_permission_is_enough() {
        let viewer = claims(TokenType::Access, false, &["view_role"]);
        assert!(authorize(&viewer, &[PermissionCode::CreateRole, PermissionCode::ViewRole]).is_ok());
        assert_eq!(
            authorize(&viewer, &[PermissionCode::CreateRole, PermissionCode::UpdateRole]),
            Err(AuthError::Unauthorized)
        );
    }

    #[test]
    fn test_claims_json_shape() {
        let mut c = claims(TokenType::Access, false, &["view_user"]);
        c.tenants = Some(vec![3]);
        let value = serde_json::to_value(&c).unwrap();

        assert_eq!(value["type"], "access_token");
        assert_eq!(value["isSuperUser"], false);
        assert_eq!(value["permissions"][0], "view_user");
        assert_eq!(value["tenants"][0], 3);
        assert!(value.get("email").is_none());
    }

    #[test]
    fn test_for_user_flattens_permissions_and_omits_empty_tenants() {
        let u = user(
            42,
            vec![role(1, "staff", vec![permission(1, "view_user")])],
        );
        let c = Claims::for_user(&u, TokenType::Refresh, "latch", 10, 20);

        assert_eq!(c.sub, "42");
        assert_eq!(c.subject_id().unwrap(), 42);
        assert_eq!(c.permissions, vec!["view_user"]);
        assert_eq!(c.tenants, None);
        assert_eq!(c.email.as_deref(), Some("user42@example.com"));
        assert!(c.is_refresh());
    }
}
