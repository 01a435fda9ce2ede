//! Sea-ORM entities for the auth schema

pub mod permissions;
pub mod role_permissions;
pub mod roles;
pub mod tenants;
pub mod user_roles;
pub mod user_tenants;
pub mod users;

pub use permissions::{Entity as Permissions, Model as Permission};
pub use role_permissions::{Entity as RolePermissions, Model as RolePermission};
pub use roles::{Entity as Roles, Model as Role};
pub use tenants::{Entity as Tenants, Model as Tenant};
pub use user_roles::{Entity as UserRoles, Model as UserRole};
pub use user_tenants::{Entity as UserTenants, Model as UserTenant};
pub use users::{Entity as Users, Model as User};
