//! Server startup and shutdown logic

use anyhow::{Context, Result};
use axum::Router;
use chrono::Utc;
use std::net::SocketAddr;
use std::sync::Arc;

use latch_auth::{
    seed_permissions, seed_super_user, AccessGuard, AuthService, BcryptHasher, PasswordHasher,
    SigningKey, TokenCodec, VerifyingKey,
};
use latch_config::{AuthConfig, LatchConfig, SuperUserConfig};
use latch_core::{Claims, PermissionCode, SuperUserProfile, TokenType};
use latch_storage::{DatabaseConnection, SeaOrmAuthRepository};
use latch_web::{app_router, AppState, CookieSettings, LoginRateLimiter, RouterConfig};

/// Server application struct
pub struct Server {
    config: LatchConfig,
    connection: DatabaseConnection,
    router: Router,
}

impl Server {
    /// Prepare everything the API needs: store, keys, seed data and router
    pub async fn new(config: LatchConfig) -> Result<Self> {
        let codec = Arc::new(load_token_codec(&config.auth)?);

        let connection = DatabaseConnection::new(storage_config(&config))
            .await
            .context("failed to connect to the database")?;
        connection.migrate().await?;
        let repository = Arc::new(SeaOrmAuthRepository::new(connection.clone()));

        let hasher: Arc<dyn PasswordHasher> = Arc::new(BcryptHasher::new(config.auth.bcrypt_cost));

        let created = seed_permissions(repository.as_ref(), &PermissionCode::ALL).await?;
        tracing::info!("Permission catalog ready ({} new)", created);

        match &config.super_user {
            Some(super_user) => {
                let profile = super_user_profile(super_user, hasher.clone()).await?;
                let user_id = seed_super_user(repository.as_ref(), profile).await?;
                tracing::info!("Super-user {} ready (id {})", super_user.email, user_id);
            }
            None => tracing::warn!("No super-user configured, skipping seeding"),
        }

        let service = AuthService::new(
            repository,
            codec.clone(),
            hasher.clone(),
            service_config(&config.auth),
        );
        let state = AppState::new(
            service,
            AccessGuard::new(codec),
            hasher,
            CookieSettings::new(config.auth.cookie_domains.clone()),
            LoginRateLimiter::new(config.server.login_rate_limit),
        );
        let router = app_router(state, &router_config(&config));

        Ok(Self {
            config,
            connection,
            router,
        })
    }

    /// The complete application router
    pub fn build_app(&self) -> Router {
        self.router.clone()
    }

    /// Serve until a shutdown signal arrives
    pub async fn start(self) -> Result<()> {
        let addr = self.config.server.socket_address();
        self.log_config_summary();

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;
        tracing::info!("Server listening on {}", addr);

        axum::serve(
            listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        self.connection.close().await?;
        tracing::info!("Server shutdown complete");
        Ok(())
    }

    fn log_config_summary(&self) {
        let config = &self.config;
        tracing::info!("=== Latch Server Configuration ===");
        tracing::info!("Bind Address: {}", config.server.socket_address());
        tracing::info!("Issuer: {}", config.auth.issuer);
        tracing::info!(
            "Token TTLs: access {}s, refresh {}s",
            config.auth.access_token_ttl.as_secs(),
            config.auth.refresh_token_ttl.as_secs()
        );
        tracing::info!(
            "Cookies: {}",
            if config.auth.cookie_domains.is_empty() {
                "Disabled".to_string()
            } else {
                config.auth.cookie_domains.join(", ")
            }
        );
        tracing::info!("Login rate limit: {}/min", config.server.login_rate_limit);
        tracing::info!("==================================");
    }
}

/// Build the token codec from the configured key material.
///
/// When a public key is configured it must belong to the private key.
pub fn load_token_codec(config: &AuthConfig) -> Result<TokenCodec> {
    let signing_key = match (&config.private_key_path, &config.private_key_base64) {
        (Some(path), _) => SigningKey::from_pem_file(path)
            .with_context(|| format!("failed to load private key {}", path.display()))?,
        (None, Some(encoded)) => SigningKey::from_base64_der(encoded)?,
        (None, None) => anyhow::bail!("no private key configured"),
    };
    let codec = TokenCodec::new(signing_key, config.issuer.clone());

    let verifying_key = match (&config.public_key_path, &config.public_key_base64) {
        (Some(path), _) => Some(
            VerifyingKey::from_pem_file(path)
                .with_context(|| format!("failed to load public key {}", path.display()))?,
        ),
        (None, Some(encoded)) => Some(VerifyingKey::from_base64_der(encoded)?),
        (None, None) => None,
    };
    if let Some(verifying_key) = verifying_key {
        ensure_key_pair(&codec, verifying_key)?;
    }

    Ok(codec)
}

fn ensure_key_pair(codec: &TokenCodec, verifying_key: VerifyingKey) -> Result<()> {
    let now = Utc::now().timestamp();
    let sample = Claims {
        sub: "0".to_string(),
        email: None,
        is_super_user: false,
        permissions: Vec::new(),
        tenants: None,
        token_type: TokenType::Access,
        iss: codec.issuer().to_string(),
        iat: now,
        exp: now + 60,
    };
    let token = codec.sign(&sample)?;
    TokenCodec::verifier(verifying_key, codec.issuer())
        .verify(&token)
        .map_err(|_| anyhow::anyhow!("configured public key does not match the private key"))?;
    Ok(())
}

async fn super_user_profile(
    config: &SuperUserConfig,
    hasher: Arc<dyn PasswordHasher>,
) -> Result<SuperUserProfile> {
    let password = config.password.clone();
    let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&password)).await??;
    Ok(SuperUserProfile {
        first_name: config.first_name.clone(),
        last_name: config.last_name.clone(),
        email: config.email.clone(),
        password_hash,
    })
}

fn storage_config(config: &LatchConfig) -> latch_storage::DatabaseConfig {
    latch_storage::DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        connection_timeout: config.database.connection_timeout,
    }
}

fn service_config(config: &AuthConfig) -> latch_auth::AuthConfig {
    latch_auth::AuthConfig {
        issuer: config.issuer.clone(),
        access_token_ttl: config.access_token_ttl,
        refresh_token_ttl: config.refresh_token_ttl,
    }
}

fn router_config(config: &LatchConfig) -> RouterConfig {
    RouterConfig {
        request_timeout: config.server.request_timeout,
        cors_allowed_origins: config.server.cors_allowed_origins.clone(),
    }
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    fn fixture(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../latch-auth/tests/fixtures")
            .join(name)
    }

    fn auth_config() -> AuthConfig {
        AuthConfig {
            private_key_path: Some(fixture("rsa_pkcs8.pem")),
            ..Default::default()
        }
    }

    #[test]
    fn test_codec_from_private_key() {
        let codec = load_token_codec(&auth_config()).unwrap();
        assert_eq!(codec.issuer(), "latch");
    }

    #[test]
    fn test_matching_public_key_is_accepted() {
        let config = AuthConfig {
            public_key_path: Some(fixture("rsa_public_spki.pem")),
            ..auth_config()
        };
        assert!(load_token_codec(&config).is_ok());
    }

    #[test]
    fn test_mismatched_public_key_is_rejected() {
        let config = AuthConfig {
            private_key_path: Some(fixture("rsa_other_pkcs1.pem")),
            public_key_path: Some(fixture("rsa_public_spki.pem")),
            ..Default::default()
        };
        let err = load_token_codec(&config).unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn test_missing_key_file() {
        let config = AuthConfig {
            private_key_path: Some(fixture("absent.pem")),
            ..Default::default()
        };
        assert!(load_token_codec(&config).is_err());
    }

    #[tokio::test]
    async fn test_server_seeds_on_startup() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = LatchConfig::default();
        config.auth = AuthConfig {
            bcrypt_cost: 4,
            ..auth_config()
        };
        config.database.url = format!("sqlite://{}?mode=rwc", dir.path().join("latch.db").display());
        config.database.max_connections = 1;
        config.database.connection_timeout = Duration::from_secs(5);
        config.super_user = Some(SuperUserConfig {
            first_name: "Super".to_string(),
            last_name: "User".to_string(),
            email: "root@example.com".to_string(),
            password: "Sup3r!Pass".to_string(),
        });

        // Starting twice over the same store must be idempotent
        Server::new(config.clone()).await.unwrap();
        let server = Server::new(config).await.unwrap();
        let _router = server.build_app();

        let repository = SeaOrmAuthRepository::new(server.connection.clone());
        let permissions = latch_core::AuthRepository::list_permissions(&repository)
            .await
            .unwrap();
        assert_eq!(permissions.len(), PermissionCode::ALL.len());
        let admin = latch_core::AuthRepository::find_user_by_email(&repository, "root@example.com")
            .await
            .unwrap()
            .unwrap();
        assert!(admin.is_super_user);
    }
}
