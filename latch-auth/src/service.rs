//! Auth service: login, token issue and refresh, user and role management

use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

use latch_core::{
    run_in_transaction, AuthError, AuthRepository, AuthResult, Claims, NewRole, NewUser,
    Permission, PermissionCode, Role, RoleChanges, TokenType, UnitOfWork, User, UserUpdate,
};

use crate::config::AuthConfig;
use crate::password::PasswordHasher;
use crate::token::TokenCodec;

/// Access and refresh token issued together at login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Seconds until the access token expires
    pub access_expires_in: u64,
    /// Seconds until the refresh token expires
    pub refresh_expires_in: u64,
}

/// How an update request is handled, given who sends it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePath {
    /// Super-user or holder of `edit_permissions_user`
    Admin,
    /// Unprivileged actor editing their own record
    SelfService,
    Forbidden,
}

impl UpdatePath {
    pub fn classify(actor: &Claims, actor_id: i32, target_id: i32) -> Self {
        if actor.is_super_user || actor.has_permission(PermissionCode::EditPermissionsUser) {
            UpdatePath::Admin
        } else if actor_id == target_id {
            UpdatePath::SelfService
        } else {
            UpdatePath::Forbidden
        }
    }
}

/// Checked against when the login email is unknown
const DECOY_PASSWORD: &str = "latch-decoy-password";

pub struct AuthService<R: AuthRepository> {
    repo: Arc<R>,
    codec: Arc<TokenCodec>,
    hasher: Arc<dyn PasswordHasher>,
    config: AuthConfig,
    decoy_hash: Arc<OnceLock<String>>,
}

impl<R: AuthRepository> Clone for AuthService<R> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            codec: self.codec.clone(),
            hasher: self.hasher.clone(),
            config: self.config.clone(),
            decoy_hash: self.decoy_hash.clone(),
        }
    }
}

impl<R: AuthRepository> AuthService<R> {
    pub fn new(
        repo: Arc<R>,
        codec: Arc<TokenCodec>,
        hasher: Arc<dyn PasswordHasher>,
        config: AuthConfig,
    ) -> Self {
        Self {
            repo,
            codec,
            hasher,
            config,
            decoy_hash: Arc::new(OnceLock::new()),
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Check credentials and return the hydrated user.
    ///
    /// Unknown email and wrong password produce the same error.
    pub async fn login(&self, email: &str, password: &str) -> AuthResult<User> {
        let Some(user) = self.repo.find_user_by_email(email.trim()).await? else {
            // Same bcrypt work as a real check, so timing does not reveal the account
            self.check_password(password, None).await?;
            warn!("Login failed for {}: unknown account", email);
            return Err(AuthError::InvalidCredentials);
        };

        if !self
            .check_password(password, Some(user.password_hash.clone()))
            .await?
        {
            warn!("Login failed for {}: wrong password", email);
            return Err(AuthError::InvalidCredentials);
        }

        if !user.active {
            warn!("Login refused for inactive account {}", user.id);
            return Err(AuthError::InactiveAccount);
        }

        info!("User {} logged in", user.id);
        Ok(user)
    }

    /// Run the bcrypt comparison on the blocking pool. Without a stored hash
    /// the password is compared against a decoy hash and the result is false.
    async fn check_password(&self, password: &str, stored_hash: Option<String>) -> AuthResult<bool> {
        let hasher = self.hasher.clone();
        let decoy_hash = self.decoy_hash.clone();
        let password = password.to_string();

        tokio::task::spawn_blocking(move || match stored_hash {
            Some(hash) => Ok(hasher.verify(&password, &hash)),
            None => {
                let hash = match decoy_hash.get() {
                    Some(hash) => hash.clone(),
                    None => {
                        let hash = hasher.hash(DECOY_PASSWORD)?;
                        decoy_hash.get_or_init(|| hash).clone()
                    }
                };
                hasher.verify(&password, &hash);
                Ok(false)
            }
        })
        .await
        .map_err(|e| AuthError::hashing(format!("password check did not finish: {}", e)))?
    }

    /// Sign a token of the given type for `user`
    pub fn issue_token(&self, user: &User, token_type: TokenType) -> AuthResult<String> {
        let now = Utc::now().timestamp();
        let ttl = i64::try_from(self.config.ttl(token_type).as_secs()).unwrap_or(i64::MAX);
        let claims = Claims::for_user(
            user,
            token_type,
            self.codec.issuer(),
            now,
            now.saturating_add(ttl),
        );
        self.codec.sign(&claims)
    }

    pub fn issue_token_pair(&self, user: &User) -> AuthResult<TokenPair> {
        Ok(TokenPair {
            access_token: self.issue_token(user, TokenType::Access)?,
            refresh_token: self.issue_token(user, TokenType::Refresh)?,
            access_expires_in: self.config.access_token_ttl.as_secs(),
            refresh_expires_in: self.config.refresh_token_ttl.as_secs(),
        })
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// The refresh token is not rotated. It stops working once the user record
    /// changes after it was issued. `iat` has whole-second resolution, so a
    /// change within the issue second also invalidates the token.
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<String> {
        let claims = self.codec.verify_as(refresh_token, TokenType::Refresh)?;
        let user_id = claims.subject_id()?;

        let Some(user) = self.repo.find_user_by_id(user_id).await? else {
            warn!("Refresh token for missing user {}", user_id);
            return Err(AuthError::InvalidToken);
        };
        if !user.active {
            warn!("Refresh refused for inactive account {}", user.id);
            return Err(AuthError::InactiveAccount);
        }
        if user.updated_at.timestamp() >= claims.iat {
            warn!("Stale refresh token for user {}", user.id);
            return Err(AuthError::InvalidToken);
        }

        debug!("Refreshed access token for user {}", user.id);
        self.issue_token(&user, TokenType::Access)
    }

    /// User behind a verified access token
    pub async fn current_user(&self, claims: &Claims) -> AuthResult<User> {
        let user_id = claims.subject_id()?;
        self.load_user(user_id).await
    }

    pub async fn list_users(&self) -> AuthResult<Vec<User>> {
        self.repo.list_users().await
    }

    pub async fn list_roles(&self) -> AuthResult<Vec<Role>> {
        self.repo.list_roles().await
    }

    pub async fn list_permissions(&self) -> AuthResult<Vec<Permission>> {
        self.repo.list_permissions().await
    }

    /// Create an active role holding exactly the given permissions
    pub async fn create_role(
        &self,
        name: &str,
        description: Option<String>,
        permission_ids: &[i32],
    ) -> AuthResult<Role> {
        let permission_ids = self.resolve_permissions(permission_ids).await?;
        let role = NewRole {
            name: name.trim().to_string(),
            description,
            active: true,
        };

        let role_id = run_in_transaction(self.repo.as_ref(), move |tx| {
            Box::pin(async move {
                let role_id = tx.create_role(role).await?;
                tx.replace_role_permissions(role_id, &permission_ids).await?;
                Ok(role_id)
            })
        })
        .await?;

        info!("Created role {} ({})", role_id, name);
        self.load_role(role_id).await
    }

    /// Change a role's columns and, when given, replace its permission set
    pub async fn update_role(
        &self,
        role_id: i32,
        changes: RoleChanges,
        permission_ids: Option<Vec<i32>>,
    ) -> AuthResult<Role> {
        self.load_role(role_id).await?;
        let permission_ids = match permission_ids {
            Some(ids) => Some(self.resolve_permissions(&ids).await?),
            None => None,
        };

        run_in_transaction(self.repo.as_ref(), move |tx| {
            Box::pin(async move {
                tx.update_role(role_id, &changes).await?;
                if let Some(ids) = permission_ids {
                    tx.replace_role_permissions(role_id, &ids).await?;
                }
                Ok(())
            })
        })
        .await?;

        info!("Updated role {}", role_id);
        self.load_role(role_id).await
    }

    /// Create a user with a pre-hashed password and the given roles.
    ///
    /// Only a super-user may create another super-user.
    pub async fn create_user(
        &self,
        actor: &Claims,
        mut user: NewUser,
        role_ids: &[i32],
    ) -> AuthResult<User> {
        user.email = normalize_email(&user.email)?;
        if user.is_super_user && !actor.is_super_user {
            warn!("User {} tried to create a super-user", actor.sub);
            return Err(AuthError::forbidden("only a super-user can create a super-user"));
        }
        if self.repo.find_user_by_email(&user.email).await?.is_some() {
            return Err(AuthError::validation("email is already registered"));
        }
        let role_ids = self.resolve_roles(role_ids).await?;

        let user_id = run_in_transaction(self.repo.as_ref(), move |tx| {
            Box::pin(async move {
                let user_id = tx.create_user(user).await?;
                tx.replace_user_roles(user_id, &role_ids).await?;
                Ok(user_id)
            })
        })
        .await?;

        info!("User {} created user {}", actor.sub, user_id);
        self.load_user(user_id).await
    }

    /// Update a user on behalf of `actor`.
    ///
    /// Admins may change every field and replace roles and tenants. A user
    /// editing their own record only changes names, phones and the active
    /// flag; anything else in the request is ignored. Everyone else is refused.
    pub async fn update_user(
        &self,
        actor: &Claims,
        target_id: i32,
        update: UserUpdate,
    ) -> AuthResult<User> {
        let target = self.load_user(target_id).await?;
        let actor_id = actor.subject_id()?;

        match UpdatePath::classify(actor, actor_id, target.id) {
            UpdatePath::Admin => self.admin_update(actor, &target, update).await?,
            UpdatePath::SelfService => self.self_update(&target, update).await?,
            UpdatePath::Forbidden => {
                warn!("User {} may not update user {}", actor_id, target_id);
                return Err(AuthError::forbidden("cannot update another user"));
            }
        }

        info!("User {} updated user {}", actor_id, target_id);
        self.load_user(target_id).await
    }

    async fn admin_update(&self, actor: &Claims, target: &User, mut update: UserUpdate) -> AuthResult<()> {
        let flips_super_user = update
            .changes
            .is_super_user
            .is_some_and(|flag| flag != target.is_super_user);
        if flips_super_user && !actor.is_super_user {
            warn!("User {} tried to change the super-user flag of {}", actor.sub, target.id);
            return Err(AuthError::forbidden(
                "only a super-user can change the super-user flag",
            ));
        }

        if let Some(email) = update.changes.email.take() {
            let email = normalize_email(&email)?;
            if email != target.email && self.repo.find_user_by_email(&email).await?.is_some() {
                return Err(AuthError::validation("email is already registered"));
            }
            update.changes.email = Some(email);
        }

        let role_ids = match update.role_ids.as_deref() {
            Some(ids) => Some(self.resolve_roles(ids).await?),
            None => None,
        };
        let tenant_ids = match update.tenant_ids.as_deref() {
            Some(ids) => Some(self.resolve_tenants(ids).await?),
            None => None,
        };

        let user_id = target.id;
        let changes = update.changes;
        run_in_transaction(self.repo.as_ref(), move |tx| {
            Box::pin(async move {
                if !changes.is_empty() {
                    tx.update_user(user_id, &changes).await?;
                }
                if let Some(ids) = role_ids {
                    tx.replace_user_roles(user_id, &ids).await?;
                }
                if let Some(ids) = tenant_ids {
                    tx.replace_user_tenants(user_id, &ids).await?;
                }
                Ok(())
            })
        })
        .await
    }

    async fn self_update(&self, target: &User, update: UserUpdate) -> AuthResult<()> {
        if update.is_privileged() {
            debug!("Ignoring privileged fields in self-update of user {}", target.id);
        }
        let changes = update.changes.restricted_to_self();
        if changes.is_empty() {
            return Ok(());
        }

        let user_id = target.id;
        run_in_transaction(self.repo.as_ref(), move |tx| {
            Box::pin(async move { tx.update_user(user_id, &changes).await })
        })
        .await
    }

    async fn load_user(&self, user_id: i32) -> AuthResult<User> {
        self.repo
            .find_user_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound { user_id })
    }

    async fn load_role(&self, role_id: i32) -> AuthResult<Role> {
        self.repo
            .find_role_by_id(role_id)
            .await?
            .ok_or_else(|| AuthError::RoleNotFound { ids: vec![role_id] })
    }

    async fn resolve_permissions(&self, ids: &[i32]) -> AuthResult<Vec<i32>> {
        let wanted = unique_ids(ids);
        if wanted.is_empty() {
            return Ok(wanted);
        }
        let found = self.repo.find_permissions_by_ids(&wanted).await?;
        match missing_ids(&wanted, found.iter().map(|p| p.id)) {
            missing if missing.is_empty() => Ok(wanted),
            missing => {
                warn!("Unknown permission ids {:?}", missing);
                Err(AuthError::PermissionNotFound { ids: missing })
            }
        }
    }

    async fn resolve_roles(&self, ids: &[i32]) -> AuthResult<Vec<i32>> {
        let wanted = unique_ids(ids);
        if wanted.is_empty() {
            return Ok(wanted);
        }
        let found = self.repo.find_roles_by_ids(&wanted).await?;
        match missing_ids(&wanted, found.iter().map(|r| r.id)) {
            missing if missing.is_empty() => Ok(wanted),
            missing => {
                warn!("Unknown role ids {:?}", missing);
                Err(AuthError::RoleNotFound { ids: missing })
            }
        }
    }

    async fn resolve_tenants(&self, ids: &[i32]) -> AuthResult<Vec<i32>> {
        let wanted = unique_ids(ids);
        if wanted.is_empty() {
            return Ok(wanted);
        }
        let found = self.repo.find_tenants_by_ids(&wanted).await?;
        match missing_ids(&wanted, found.iter().map(|t| t.id)) {
            missing if missing.is_empty() => Ok(wanted),
            missing => {
                warn!("Unknown tenant ids {:?}", missing);
                Err(AuthError::TenantNotFound { ids: missing })
            }
        }
    }
}

/// Trim an email and check it has the `local@domain` shape
pub fn normalize_email(email: &str) -> AuthResult<String> {
    let email = email.trim();
    let well_formed = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !well_formed {
        return Err(AuthError::validation("a valid email is required"));
    }
    Ok(email.to_string())
}

fn unique_ids(ids: &[i32]) -> Vec<i32> {
    ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect()
}

fn missing_ids(wanted: &[i32], found: impl Iterator<Item = i32>) -> Vec<i32> {
    let found: BTreeSet<i32> = found.collect();
    wanted.iter().copied().filter(|id| !found.contains(id)).collect()
}
