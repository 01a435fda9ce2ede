//! Persistence contracts consumed by the auth service
//!
//! Reads go through [`AuthRepository`]; every write happens inside a
//! [`UnitOfWork`] obtained from [`AuthRepository::begin`]. A unit of work that
//! is dropped without [`UnitOfWork::commit`] must roll back.
//!
//! Calls carry no explicit deadline: callers bound them with
//! `tokio::time::timeout` and cancel them by dropping the future.

use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;

use crate::error::AuthResult;
use crate::models::{
    NewRole, NewUser, Permission, Role, RoleChanges, Tenant, User, UserChanges,
};

/// Boxed future borrowed from a unit of work
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Read side of the store. Users are returned with roles, role permissions and
/// tenants loaded. Soft-deleted rows are never returned.
#[async_trait]
pub trait AuthRepository: Send + Sync {
    type Tx: UnitOfWork;

    /// Verify the store is reachable
    async fn health_check(&self) -> AuthResult<()>;

    async fn find_user_by_email(&self, email: &str) -> AuthResult<Option<User>>;

    async fn find_user_by_id(&self, id: i32) -> AuthResult<Option<User>>;

    async fn list_users(&self) -> AuthResult<Vec<User>>;

    /// Returns only the ids that exist; callers compare counts.
    async fn find_permissions_by_ids(&self, ids: &[i32]) -> AuthResult<Vec<Permission>>;

    async fn find_permission_by_code(&self, code: &str) -> AuthResult<Option<Permission>>;

    async fn list_permissions(&self) -> AuthResult<Vec<Permission>>;

    async fn find_role_by_id(&self, id: i32) -> AuthResult<Option<Role>>;

    /// Returns only the ids that exist; callers compare counts.
    async fn find_roles_by_ids(&self, ids: &[i32]) -> AuthResult<Vec<Role>>;

    async fn list_roles(&self) -> AuthResult<Vec<Role>>;

    /// Returns only the ids that exist; callers compare counts.
    async fn find_tenants_by_ids(&self, ids: &[i32]) -> AuthResult<Vec<Tenant>>;

    /// Open a unit of work
    async fn begin(&self) -> AuthResult<Self::Tx>;
}

/// Write side of the store, scoped to one transaction.
///
/// Failures are reported as `AuthError::Transaction`.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Insert a user and return its id
    async fn create_user(&mut self, user: NewUser) -> AuthResult<i32>;

    /// Apply column changes and bump `updated_at`
    async fn update_user(&mut self, id: i32, changes: &UserChanges) -> AuthResult<()>;

    /// Replace the user's role set and bump `updated_at`
    async fn replace_user_roles(&mut self, user_id: i32, role_ids: &[i32]) -> AuthResult<()>;

    /// Replace the user's tenant set and bump `updated_at`
    async fn replace_user_tenants(&mut self, user_id: i32, tenant_ids: &[i32]) -> AuthResult<()>;

    /// Insert a role and return its id
    async fn create_role(&mut self, role: NewRole) -> AuthResult<i32>;

    async fn update_role(&mut self, id: i32, changes: &RoleChanges) -> AuthResult<()>;

    async fn replace_role_permissions(
        &mut self,
        role_id: i32,
        permission_ids: &[i32],
    ) -> AuthResult<()>;

    /// Insert the permission if its code is unknown; existing rows are left untouched.
    /// Returns the row and whether it was created.
    async fn upsert_permission(&mut self, code: &str) -> AuthResult<(Permission, bool)>;

    /// Return the id of the user with this email, inserting it first if absent.
    /// The flag tells whether a row was created. A soft-deleted user with the
    /// email counts as existing and stays deleted.
    async fn first_or_create_user(&mut self, user: NewUser) -> AuthResult<(i32, bool)>;

    async fn commit(self) -> AuthResult<()>;
}

/// Run `work` inside a unit of work, committing on success.
///
/// An error from `work` drops the unit of work, which rolls it back.
pub async fn run_in_transaction<R, T, F>(repo: &R, work: F) -> AuthResult<T>
where
    R: AuthRepository + ?Sized,
    T: Send,
    F: for<'tx> FnOnce(&'tx mut R::Tx) -> BoxFuture<'tx, AuthResult<T>> + Send,
{
    let mut tx = repo.begin().await?;
    let value = work(&mut tx).await?;
    tx.commit().await?;
    Ok(value)
}
