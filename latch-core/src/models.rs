//! Domain entities as seen by the auth service

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// Atomic capability identified by its code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permission {
    pub id: i32,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub active: bool,
}

/// Named permission bundle
#[derive(Debug, Clone, PartialEq)]
pub struct Role {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
    pub permissions: Vec<Permission>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Grouping of users, independent of roles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tenant {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
}

/// Identity record, hydrated with roles (and their permissions) and tenants
#[derive(Clone, PartialEq)]
pub struct User {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub username: Option<String>,
    pub email: String,
    pub password_hash: String,
    pub active: bool,
    pub is_super_user: bool,
    pub phone1: Option<String>,
    pub phone2: Option<String>,
    pub roles: Vec<Role>,
    pub tenants: Vec<Tenant>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Union of permission codes granted by the user's active roles
    pub fn permission_codes(&self) -> Vec<String> {
        self.roles
            .iter()
            .filter(|role| role.active)
            .flat_map(|role| role.permissions.iter())
            .filter(|permission| permission.active)
            .map(|permission| permission.code.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn tenant_ids(&self) -> Vec<i32> {
        self.tenants.iter().map(|tenant| tenant.id).collect()
    }

    pub fn role_names(&self) -> Vec<String> {
        self.roles.iter().map(|role| role.name.clone()).collect()
    }
}

// Keeps the password hash out of logs.
impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("active", &self.active)
            .field("is_super_user", &self.is_super_user)
            .field("roles", &self.role_names())
            .field("tenants", &self.tenant_ids())
            .finish_non_exhaustive()
    }
}

/// Fields of a user to be inserted. The password is already hashed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub username: Option<String>,
    pub email: String,
    pub password_hash: String,
    pub active: bool,
    pub is_super_user: bool,
    pub phone1: Option<String>,
    pub phone2: Option<String>,
}

/// Partial update of a user's columns. `None` leaves a column untouched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UserChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone1: Option<String>,
    pub phone2: Option<String>,
    pub active: Option<bool>,
    pub is_super_user: Option<bool>,
}

impl UserChanges {
    /// Only the fields a user may change on their own record
    pub fn restricted_to_self(&self) -> Self {
        Self {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            phone1: self.phone1.clone(),
            phone2: self.phone2.clone(),
            active: self.active,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Update request for a user: column changes plus optional association replacement
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UserUpdate {
    pub changes: UserChanges,
    pub role_ids: Option<Vec<i32>>,
    pub tenant_ids: Option<Vec<i32>>,
}

impl UserUpdate {
    /// True when the request touches anything only an admin may change
    pub fn is_privileged(&self) -> bool {
        self.changes.is_super_user.is_some()
            || self.changes.email.is_some()
            || self.changes.username.is_some()
            || self.role_ids.is_some()
            || self.tenant_ids.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRole {
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RoleChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub active: Option<bool>,
}

/// Profile of the bootstrap super-user. The password is already hashed.
#[derive(Debug, Clone, PartialEq)]
pub struct SuperUserProfile {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn permission(id: i32, code: &str) -> Permission {
        Permission {
            id,
            name: code.to_string(),
            code: code.to_string(),
            description: None,
            active: true,
        }
    }

    pub fn role(id: i32, name: &str, permissions: Vec<Permission>) -> Role {
        Role {
            id,
            name: name.to_string(),
            description: None,
            active: true,
            permissions,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub fn user(id: i32, roles: Vec<Role>) -> User {
        User {
            id,
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            username: None,
            email: format!("user{}@example.com", id),
            password_hash: "$2b$04$hash".to_string(),
            active: true,
            is_super_user: false,
            phone1: None,
            phone2: None,
            roles,
            tenants: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_permission_codes_union_across_roles() {
        let user = user(
            1,
            vec![
                role(1, "editors", vec![permission(1, "view_user"), permission(2, "update_user")]),
                role(2, "viewers", vec![permission(1, "view_user"), permission(3, "view_role")]),
            ],
        );

        assert_eq!(
            user.permission_codes(),
            vec!["update_user", "view_role", "view_user"]
        );
    }

    #[test]
    fn test_inactive_roles_and_permissions_grant_nothing() {
        let mut disabled_role = role(1, "old", vec![permission(1, "create_user")]);
        disabled_role.active = false;
        let mut disabled_permission = permission(2, "create_role");
        disabled_permission.active = false;

        let user = user(1, vec![disabled_role, role(2, "current", vec![disabled_permission])]);
        assert!(user.permission_codes().is_empty());
    }

    #[test]
    fn test_debug_hides_password_hash() {
        let user = user(7, Vec::new());
        let rendered = format!("{:?}", user);
        assert!(!rendered.contains("$2b$"));
        assert!(rendered.contains("user7@example.com"));
    }

    #[test]
    fn test_restricted_to_self_drops_privileged_fields() {
        let changes = UserChanges {
            first_name: Some("Grace".to_string()),
            email: Some("other@example.com".to_string()),
            active: Some(false),
            is_super_user: Some(true),
            ..Default::default()
        };

        let restricted = changes.restricted_to_self();
        assert_eq!(restricted.first_name.as_deref(), Some("Grace"));
        assert_eq!(restricted.active, Some(false));
        assert!(restricted.email.is_none());
        assert!(restricted.is_super_user.is_none());
    }
}
