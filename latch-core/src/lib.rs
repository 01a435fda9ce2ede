//! # Latch Core
//!
//! Domain layer of the Latch authentication module:
//!
//! - **Models**: users, roles, permissions and tenants
//! - **Claims**: token payload and the `authorize` permission evaluator
//! - **Permissions**: the built-in permission catalog
//! - **Pagination**: page slicing for listings
//! - **Repository**: read and unit-of-work contracts implemented by storage
//! - **Errors**: the shared `AuthError` taxonomy

pub mod claims;
pub mod error;
pub mod models;
pub mod pagination;
pub mod permissions;
pub mod repository;

pub use claims::{authorize, Claims, TokenType};
pub use error::{AuthError, AuthResult, INVALID_CREDENTIALS_MESSAGE};
pub use models::{
    NewRole, NewUser, Permission, Role, RoleChanges, SuperUserProfile, Tenant, User,
    UserChanges, UserUpdate,
};
pub use pagination::{paginate, Paginated};
pub use permissions::PermissionCode;
pub use repository::{run_in_transaction, AuthRepository, BoxFuture, UnitOfWork};
