//! Sea-ORM implementation of the auth repository contracts

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, DbErr,
    EntityTrait, QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};
use std::collections::HashMap;
use tracing::{debug, warn};

use latch_core::{
    AuthError, AuthRepository, AuthResult, NewRole, NewUser, Permission, Role, RoleChanges, Tenant,
    UnitOfWork, User, UserChanges,
};

use crate::connection::DatabaseConnection;
use crate::entities::{
    permissions, role_permissions, roles, tenants, user_roles, user_tenants, users, Permissions,
    RolePermissions, Roles, Tenants, UserRoles, UserTenants, Users,
};

/// Auth repository backed by a Sea-ORM connection pool
#[derive(Clone)]
pub struct SeaOrmAuthRepository {
    db: DatabaseConnection,
}

impl SeaOrmAuthRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    async fn hydrated_users(&self, models: Vec<users::Model>) -> AuthResult<Vec<User>> {
        hydrate_users(self.db.get_connection(), models)
            .await
            .map_err(read_error)
    }

    async fn hydrated_roles(&self, models: Vec<roles::Model>) -> AuthResult<Vec<Role>> {
        hydrate_roles(self.db.get_connection(), models)
            .await
            .map_err(read_error)
    }
}

#[async_trait]
impl AuthRepository for SeaOrmAuthRepository {
    type Tx = SeaOrmUnitOfWork;

    async fn health_check(&self) -> AuthResult<()> {
        self.db
            .get_connection()
            .ping()
            .await
            .map_err(read_error)
    }

    async fn find_user_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        let model = Users::find()
            .filter(users::Column::Email.eq(email))
            .filter(users::Column::DeletedAt.is_null())
            .one(self.db.get_connection())
            .await
            .map_err(read_error)?;

        match model {
            Some(model) => Ok(self.hydrated_users(vec![model]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_user_by_id(&self, id: i32) -> AuthResult<Option<User>> {
        let model = Users::find_by_id(id)
            .filter(users::Column::DeletedAt.is_null())
            .one(self.db.get_connection())
            .await
            .map_err(read_error)?;

        match model {
            Some(model) => Ok(self.hydrated_users(vec![model]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_users(&self) -> AuthResult<Vec<User>> {
        let models = Users::find()
            .filter(users::Column::DeletedAt.is_null())
            .order_by_asc(users::Column::Id)
            .all(self.db.get_connection())
            .await
            .map_err(read_error)?;

        self.hydrated_users(models).await
    }

    async fn find_permissions_by_ids(&self, ids: &[i32]) -> AuthResult<Vec<Permission>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let models = Permissions::find()
            .filter(permissions::Column::Id.is_in(ids.iter().copied()))
            .filter(permissions::Column::DeletedAt.is_null())
            .order_by_asc(permissions::Column::Id)
            .all(self.db.get_connection())
            .await
            .map_err(read_error)?;

        Ok(models.into_iter().map(to_permission).collect())
    }

    async fn find_permission_by_code(&self, code: &str) -> AuthResult<Option<Permission>> {
        let model = Permissions::find()
            .filter(permissions::Column::Code.eq(code))
            .filter(permissions::Column::DeletedAt.is_null())
            .one(self.db.get_connection())
            .await
            .map_err(read_error)?;

        Ok(model.map(to_permission))
    }

    async fn list_permissions(&self) -> AuthResult<Vec<Permission>> {
        let models = Permissions::find()
            .filter(permissions::Column::DeletedAt.is_null())
            .order_by_asc(permissions::Column::Id)
            .all(self.db.get_connection())
            .await
            .map_err(read_error)?;

        Ok(models.into_iter().map(to_permission).collect())
    }

    async fn find_role_by_id(&self, id: i32) -> AuthResult<Option<Role>> {
        let model = Roles::find_by_id(id)
            .filter(roles::Column::DeletedAt.is_null())
            .one(self.db.get_connection())
            .await
            .map_err(read_error)?;

        match model {
            Some(model) => Ok(self.hydrated_roles(vec![model]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_roles_by_ids(&self, ids: &[i32]) -> AuthResult<Vec<Role>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let models = Roles::find()
            .filter(roles::Column::Id.is_in(ids.iter().copied()))
            .filter(roles::Column::DeletedAt.is_null())
            .order_by_asc(roles::Column::Id)
            .all(self.db.get_connection())
            .await
            .map_err(read_error)?;

        self.hydrated_roles(models).await
    }

    async fn list_roles(&self) -> AuthResult<Vec<Role>> {
        let models = Roles::find()
            .filter(roles::Column::DeletedAt.is_null())
            .order_by_asc(roles::Column::Id)
            .all(self.db.get_connection())
            .await
            .map_err(read_error)?;

        self.hydrated_roles(models).await
    }

    async fn find_tenants_by_ids(&self, ids: &[i32]) -> AuthResult<Vec<Tenant>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let models = Tenants::find()
            .filter(tenants::Column::Id.is_in(ids.iter().copied()))
            .filter(tenants::Column::DeletedAt.is_null())
            .order_by_asc(tenants::Column::Id)
            .all(self.db.get_connection())
            .await
            .map_err(read_error)?;

        Ok(models.into_iter().map(to_tenant).collect())
    }

    async fn begin(&self) -> AuthResult<SeaOrmUnitOfWork> {
        let tx = self
            .db
            .get_connection()
            .begin()
            .await
            .map_err(|e| AuthError::transaction(format!("failed to begin transaction: {}", e)))?;
        Ok(SeaOrmUnitOfWork { tx })
    }
}

/// One database transaction. Dropping it without `commit` rolls back.
pub struct SeaOrmUnitOfWork {
    tx: DatabaseTransaction,
}

impl SeaOrmUnitOfWork {
    async fn touch_users(&self, ids: Vec<i32>) -> AuthResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        Users::update_many()
            .col_expr(users::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(users::Column::Id.is_in(ids))
            .exec(&self.tx)
            .await
            .map_err(write_error)?;
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for SeaOrmUnitOfWork {
    async fn create_user(&mut self, user: NewUser) -> AuthResult<i32> {
        let now = Utc::now();
        let model = users::ActiveModel {
            first_name: Set(user.first_name),
            last_name: Set(user.last_name),
            username: Set(user.username),
            email: Set(user.email),
            password: Set(user.password_hash),
            active: Set(user.active),
            is_super_user: Set(user.is_super_user),
            phone1: Set(user.phone1),
            phone2: Set(user.phone2),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
            ..Default::default()
        }
        .insert(&self.tx)
        .await
        .map_err(write_error)?;

        debug!("Inserted user {}", model.id);
        Ok(model.id)
    }

    async fn update_user(&mut self, id: i32, changes: &UserChanges) -> AuthResult<()> {
        let mut model = users::ActiveModel {
            id: Set(id),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };
        if let Some(first_name) = &changes.first_name {
            model.first_name = Set(first_name.clone());
        }
        if let Some(last_name) = &changes.last_name {
            model.last_name = Set(last_name.clone());
        }
        if let Some(username) = &changes.username {
            model.username = Set(Some(username.clone()));
        }
        if let Some(email) = &changes.email {
            model.email = Set(email.clone());
        }
        if let Some(phone1) = &changes.phone1 {
            model.phone1 = Set(Some(phone1.clone()));
        }
        if let Some(phone2) = &changes.phone2 {
            model.phone2 = Set(Some(phone2.clone()));
        }
        if let Some(active) = changes.active {
            model.active = Set(active);
        }
        if let Some(is_super_user) = changes.is_super_user {
            model.is_super_user = Set(is_super_user);
        }

        model.update(&self.tx).await.map_err(write_error)?;
        Ok(())
    }

    async fn replace_user_roles(&mut self, user_id: i32, role_ids: &[i32]) -> AuthResult<()> {
        UserRoles::delete_many()
            .filter(user_roles::Column::UserId.eq(user_id))
            .exec(&self.tx)
            .await
            .map_err(write_error)?;

        if !role_ids.is_empty() {
            let rows = role_ids.iter().map(|&role_id| user_roles::ActiveModel {
                user_id: Set(user_id),
                role_id: Set(role_id),
            });
            UserRoles::insert_many(rows)
                .exec_without_returning(&self.tx)
                .await
                .map_err(write_error)?;
        }

        self.touch_users(vec![user_id]).await
    }

    async fn replace_user_tenants(&mut self, user_id: i32, tenant_ids: &[i32]) -> AuthResult<()> {
        UserTenants::delete_many()
            .filter(user_tenants::Column::UserId.eq(user_id))
            .exec(&self.tx)
            .await
            .map_err(write_error)?;

        if !tenant_ids.is_empty() {
            let rows = tenant_ids.iter().map(|&tenant_id| user_tenants::ActiveModel {
                user_id: Set(user_id),
                tenant_id: Set(tenant_id),
            });
            UserTenants::insert_many(rows)
                .exec_without_returning(&self.tx)
                .await
                .map_err(write_error)?;
        }

        self.touch_users(vec![user_id]).await
    }

    async fn create_role(&mut self, role: NewRole) -> AuthResult<i32> {
        let now = Utc::now();
        let model = roles::ActiveModel {
            name: Set(role.name),
            description: Set(role.description),
            active: Set(role.active),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
            ..Default::default()
        }
        .insert(&self.tx)
        .await
        .map_err(write_error)?;

        debug!("Inserted role {}", model.id);
        Ok(model.id)
    }

    async fn update_role(&mut self, id: i32, changes: &RoleChanges) -> AuthResult<()> {
        let mut model = roles::ActiveModel {
            id: Set(id),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };
        if let Some(name) = &changes.name {
            model.name = Set(name.clone());
        }
        if let Some(description) = &changes.description {
            model.description = Set(Some(description.clone()));
        }
        if let Some(active) = changes.active {
            model.active = Set(active);
        }

        model.update(&self.tx).await.map_err(write_error)?;

        // Holders' effective permissions change with the role's active flag
        if changes.active.is_some() {
            let holders = role_holders(&self.tx, id).await?;
            self.touch_users(holders).await?;
        }
        Ok(())
    }

    async fn replace_role_permissions(
        &mut self,
        role_id: i32,
        permission_ids: &[i32],
    ) -> AuthResult<()> {
        RolePermissions::delete_many()
            .filter(role_permissions::Column::RoleId.eq(role_id))
            .exec(&self.tx)
            .await
            .map_err(write_error)?;

        if !permission_ids.is_empty() {
            let rows = permission_ids
                .iter()
                .map(|&permission_id| role_permissions::ActiveModel {
                    role_id: Set(role_id),
                    permission_id: Set(permission_id),
                });
            RolePermissions::insert_many(rows)
                .exec_without_returning(&self.tx)
                .await
                .map_err(write_error)?;
        }

        Roles::update_many()
            .col_expr(roles::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(roles::Column::Id.eq(role_id))
            .exec(&self.tx)
            .await
            .map_err(write_error)?;

        let holders = role_holders(&self.tx, role_id).await?;
        self.touch_users(holders).await
    }

    async fn upsert_permission(&mut self, code: &str) -> AuthResult<(Permission, bool)> {
        let existing = Permissions::find()
            .filter(permissions::Column::Code.eq(code))
            .one(&self.tx)
            .await
            .map_err(write_error)?;
        if let Some(model) = existing {
            return Ok((to_permission(model), false));
        }

        let now = Utc::now();
        let model = permissions::ActiveModel {
            name: Set(code.to_string()),
            code: Set(code.to_string()),
            description: Set(None),
            active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
            ..Default::default()
        }
        .insert(&self.tx)
        .await
        .map_err(write_error)?;

        debug!("Inserted permission {} ({})", model.id, model.code);
        Ok((to_permission(model), true))
    }

    // Soft-deleted rows still own their email, so they match here and are
    // not restored.
    async fn first_or_create_user(&mut self, user: NewUser) -> AuthResult<(i32, bool)> {
        let existing = Users::find()
            .filter(users::Column::Email.eq(user.email.as_str()))
            .one(&self.tx)
            .await
            .map_err(write_error)?;
        if let Some(model) = existing {
            if model.deleted_at.is_some() {
                warn!(
                    "User {} with email {} is soft-deleted and will not be restored",
                    model.id, model.email
                );
            }
            return Ok((model.id, false));
        }

        let id = self.create_user(user).await?;
        Ok((id, true))
    }

    async fn commit(self) -> AuthResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| AuthError::transaction(format!("failed to commit: {}", e)))
    }
}

async fn role_holders<C: ConnectionTrait>(db: &C, role_id: i32) -> AuthResult<Vec<i32>> {
    let rows = UserRoles::find()
        .filter(user_roles::Column::RoleId.eq(role_id))
        .all(db)
        .await
        .map_err(write_error)?;
    Ok(rows.into_iter().map(|row| row.user_id).collect())
}

/// Load roles (with their permissions) and tenants for a batch of users
async fn hydrate_users<C: ConnectionTrait>(
    db: &C,
    models: Vec<users::Model>,
) -> Result<Vec<User>, DbErr> {
    if models.is_empty() {
        return Ok(Vec::new());
    }
    let user_ids: Vec<i32> = models.iter().map(|m| m.id).collect();

    let role_links = UserRoles::find()
        .filter(user_roles::Column::UserId.is_in(user_ids.clone()))
        .all(db)
        .await?;
    let mut role_ids: Vec<i32> = role_links.iter().map(|link| link.role_id).collect();
    role_ids.sort_unstable();
    role_ids.dedup();

    let role_models = if role_ids.is_empty() {
        Vec::new()
    } else {
        Roles::find()
            .filter(roles::Column::Id.is_in(role_ids))
            .filter(roles::Column::DeletedAt.is_null())
            .order_by_asc(roles::Column::Id)
            .all(db)
            .await?
    };
    let roles_by_id: HashMap<i32, Role> = hydrate_roles(db, role_models)
        .await?
        .into_iter()
        .map(|role| (role.id, role))
        .collect();

    let tenant_links = UserTenants::find()
        .filter(user_tenants::Column::UserId.is_in(user_ids))
        .all(db)
        .await?;
    let mut tenant_ids: Vec<i32> = tenant_links.iter().map(|link| link.tenant_id).collect();
    tenant_ids.sort_unstable();
    tenant_ids.dedup();

    let tenants_by_id: HashMap<i32, Tenant> = if tenant_ids.is_empty() {
        HashMap::new()
    } else {
        Tenants::find()
            .filter(tenants::Column::Id.is_in(tenant_ids))
            .filter(tenants::Column::DeletedAt.is_null())
            .all(db)
            .await?
            .into_iter()
            .map(|model| (model.id, to_tenant(model)))
            .collect()
    };

    let mut roles_of: HashMap<i32, Vec<i32>> = HashMap::new();
    for link in role_links {
        roles_of.entry(link.user_id).or_default().push(link.role_id);
    }
    let mut tenants_of: HashMap<i32, Vec<i32>> = HashMap::new();
    for link in tenant_links {
        tenants_of.entry(link.user_id).or_default().push(link.tenant_id);
    }

    Ok(models
        .into_iter()
        .map(|model| {
            let mut roles: Vec<Role> = roles_of
                .remove(&model.id)
                .unwrap_or_default()
                .into_iter()
                .filter_map(|id| roles_by_id.get(&id).cloned())
                .collect();
            roles.sort_by_key(|role| role.id);

            let mut tenants: Vec<Tenant> = tenants_of
                .remove(&model.id)
                .unwrap_or_default()
                .into_iter()
                .filter_map(|id| tenants_by_id.get(&id).cloned())
                .collect();
            tenants.sort_by_key(|tenant| tenant.id);

            to_user(model, roles, tenants)
        })
        .collect())
}

/// Load permissions for a batch of roles
async fn hydrate_roles<C: ConnectionTrait>(
    db: &C,
    models: Vec<roles::Model>,
) -> Result<Vec<Role>, DbErr> {
    if models.is_empty() {
        return Ok(Vec::new());
    }
    let role_ids: Vec<i32> = models.iter().map(|m| m.id).collect();

    let links = RolePermissions::find()
        .filter(role_permissions::Column::RoleId.is_in(role_ids))
        .all(db)
        .await?;
    let mut permission_ids: Vec<i32> = links.iter().map(|link| link.permission_id).collect();
    permission_ids.sort_unstable();
    permission_ids.dedup();

    let permissions_by_id: HashMap<i32, Permission> = if permission_ids.is_empty() {
        HashMap::new()
    } else {
        Permissions::find()
            .filter(permissions::Column::Id.is_in(permission_ids))
            .filter(permissions::Column::DeletedAt.is_null())
            .all(db)
            .await?
            .into_iter()
            .map(|model| (model.id, to_permission(model)))
            .collect()
    };

    let mut permissions_of: HashMap<i32, Vec<i32>> = HashMap::new();
    for link in links {
        permissions_of
            .entry(link.role_id)
            .or_default()
            .push(link.permission_id);
    }

    Ok(models
        .into_iter()
        .map(|model| {
            let mut permissions: Vec<Permission> = permissions_of
                .remove(&model.id)
                .unwrap_or_default()
                .into_iter()
                .filter_map(|id| permissions_by_id.get(&id).cloned())
                .collect();
            permissions.sort_by_key(|permission| permission.id);

            Role {
                id: model.id,
                name: model.name,
                description: model.description,
                active: model.active,
                permissions,
                created_at: model.created_at,
                updated_at: model.updated_at,
            }
        })
        .collect())
}

fn to_user(model: users::Model, roles: Vec<Role>, tenants: Vec<Tenant>) -> User {
    User {
        id: model.id,
        first_name: model.first_name,
        last_name: model.last_name,
        username: model.username,
        email: model.email,
        password_hash: model.password,
        active: model.active,
        is_super_user: model.is_super_user,
        phone1: model.phone1,
        phone2: model.phone2,
        roles,
        tenants,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

fn to_permission(model: permissions::Model) -> Permission {
    Permission {
        id: model.id,
        name: model.name,
        code: model.code,
        description: model.description,
        active: model.active,
    }
}

fn to_tenant(model: tenants::Model) -> Tenant {
    Tenant {
        id: model.id,
        name: model.name,
        description: model.description,
        active: model.active,
    }
}

fn read_error(err: DbErr) -> AuthError {
    AuthError::repository(err.to_string())
}

fn write_error(err: DbErr) -> AuthError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => {
            AuthError::validation(format!("duplicate value: {}", detail))
        }
        Some(SqlErr::ForeignKeyConstraintViolation(detail)) => {
            AuthError::validation(format!("unknown reference: {}", detail))
        }
        _ => AuthError::transaction(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unclassified_write_error_is_transaction() {
        let err = write_error(DbErr::Custom("boom".to_string()));
        assert!(matches!(err, AuthError::Transaction { .. }));
    }

    #[test]
    fn test_read_error_is_repository() {
        let err = read_error(DbErr::Custom("boom".to_string()));
        assert!(matches!(err, AuthError::Repository { .. }));
    }
}
