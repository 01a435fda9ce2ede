//! Request and response bodies. Password hashes never leave the service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use latch_core::{Permission, Role, RoleChanges, Tenant, User, UserChanges, UserUpdate};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Seconds until the access token expires
    pub expires_in: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl PageQuery {
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(DEFAULT_PAGE)
    }

    pub fn limit(&self) -> u64 {
        self.limit.unwrap_or(DEFAULT_LIMIT)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub username: Option<String>,
    pub email: String,
    pub password: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub is_super_user: bool,
    #[serde(default)]
    pub phone1: Option<String>,
    #[serde(default)]
    pub phone2: Option<String>,
    #[serde(default)]
    pub role_ids: Vec<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone1: Option<String>,
    pub phone2: Option<String>,
    pub active: Option<bool>,
    pub is_super_user: Option<bool>,
    pub role_ids: Option<Vec<i32>>,
    pub tenant_ids: Option<Vec<i32>>,
}

impl From<UpdateUserRequest> for UserUpdate {
    fn from(request: UpdateUserRequest) -> Self {
        UserUpdate {
            changes: UserChanges {
                first_name: request.first_name,
                last_name: request.last_name,
                username: request.username,
                email: request.email,
                phone1: request.phone1,
                phone2: request.phone2,
                active: request.active,
                is_super_user: request.is_super_user,
            },
            role_ids: request.role_ids,
            tenant_ids: request.tenant_ids,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateRoleRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub permission_ids: Vec<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateRoleRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub active: Option<bool>,
    pub permission_ids: Option<Vec<i32>>,
}

impl UpdateRoleRequest {
    pub fn into_parts(self) -> (RoleChanges, Option<Vec<i32>>) {
        (
            RoleChanges {
                name: self.name,
                description: self.description,
                active: self.active,
            },
            self.permission_ids,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionResponse {
    pub id: i32,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub active: bool,
}

impl From<Permission> for PermissionResponse {
    fn from(permission: Permission) -> Self {
        Self {
            id: permission.id,
            name: permission.name,
            code: permission.code,
            description: permission.description,
            active: permission.active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleResponse {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
    pub permissions: Vec<PermissionResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Role> for RoleResponse {
    fn from(role: Role) -> Self {
        Self {
            id: role.id,
            name: role.name,
            description: role.description,
            active: role.active,
            permissions: role.permissions.into_iter().map(Into::into).collect(),
            created_at: role.created_at,
            updated_at: role.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantResponse {
    pub id: i32,
    pub name: String,
    pub active: bool,
}

impl From<Tenant> for TenantResponse {
    fn from(tenant: Tenant) -> Self {
        Self {
            id: tenant.id,
            name: tenant.name,
            active: tenant.active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub username: Option<String>,
    pub email: String,
    pub active: bool,
    pub is_super_user: bool,
    pub phone1: Option<String>,
    pub phone2: Option<String>,
    pub roles: Vec<RoleResponse>,
    pub tenants: Vec<TenantResponse>,
    /// Effective permission codes granted through active roles
    pub permissions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        let permissions = user.permission_codes();
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            username: user.username,
            email: user.email,
            active: user.active,
            is_super_user: user.is_super_user,
            phone1: user.phone1,
            phone2: user.phone2,
            roles: user.roles.into_iter().map(Into::into).collect(),
            tenants: user.tenants.into_iter().map(Into::into).collect(),
            permissions,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

fn default_active() -> bool {
    true
}
