//! Shared handler state

use axum::http::HeaderMap;
use std::sync::Arc;

use latch_auth::{AccessGuard, AuthService, PasswordHasher};
use latch_core::{AuthRepository, Claims, PermissionCode};

use crate::errors::{WebError, WebResult};
use crate::rate_limit::LoginRateLimiter;
use crate::transport::{authorization_header, read_cookie, CookieSettings, ACCESS_TOKEN_COOKIE};

pub struct AppState<R: AuthRepository> {
    pub service: AuthService<R>,
    pub guard: AccessGuard,
    /// Hashes passwords of users created over HTTP
    pub hasher: Arc<dyn PasswordHasher>,
    pub cookies: CookieSettings,
    pub login_limiter: Arc<LoginRateLimiter>,
}

impl<R: AuthRepository> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            guard: self.guard.clone(),
            hasher: self.hasher.clone(),
            cookies: self.cookies.clone(),
            login_limiter: self.login_limiter.clone(),
        }
    }
}

impl<R: AuthRepository> AppState<R> {
    pub fn new(
        service: AuthService<R>,
        guard: AccessGuard,
        hasher: Arc<dyn PasswordHasher>,
        cookies: CookieSettings,
        login_limiter: LoginRateLimiter,
    ) -> Self {
        Self {
            service,
            guard,
            hasher,
            cookies,
            login_limiter: Arc::new(login_limiter),
        }
    }

    /// Verify the request's access token (header first, then cookie) and
    /// check it grants one of `required`.
    pub fn authorize(&self, headers: &HeaderMap, required: &[PermissionCode]) -> WebResult<Claims> {
        let claims = self.guard.guard_request(
            authorization_header(headers),
            read_cookie(headers, ACCESS_TOKEN_COOKIE),
            required,
        )?;
        Ok(claims)
    }

    /// bcrypt off the async workers
    pub async fn hash_password(&self, password: String) -> WebResult<String> {
        let hasher = self.hasher.clone();
        let hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| WebError::internal(format!("hashing task failed: {}", e)))?;
        Ok(hash?)
    }
}
