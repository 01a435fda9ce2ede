//! Built-in permission catalog

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Permission codes known to the system. Seeded at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionCode {
    CreateUser,
    ViewUser,
    UpdateUser,
    /// Grants the admin update path: roles, tenants and the super-user flag
    EditPermissionsUser,
    CreateRole,
    ViewRole,
    UpdateRole,
    ViewPermission,
}

impl PermissionCode {
    pub const ALL: [PermissionCode; 8] = [
        PermissionCode::CreateUser,
        PermissionCode::ViewUser,
        PermissionCode::UpdateUser,
        PermissionCode::EditPermissionsUser,
        PermissionCode::CreateRole,
        PermissionCode::ViewRole,
        PermissionCode::UpdateRole,
        PermissionCode::ViewPermission,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionCode::CreateUser => "create_user",
            PermissionCode::ViewUser => "view_user",
            PermissionCode::UpdateUser => "update_user",
            PermissionCode::EditPermissionsUser => "edit_permissions_user",
            PermissionCode::CreateRole => "create_role",
            PermissionCode::ViewRole => "view_role",
            PermissionCode::UpdateRole => "update_role",
            PermissionCode::ViewPermission => "view_permission",
        }
    }
}

impl fmt::Display for PermissionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PermissionCode::ALL
            .into_iter()
            .find(|code| code.as_str() == s)
            .ok_or_else(|| format!("unknown permission code: {}", s))
    }
}
