//! Test application wired to a migrated SQLite file

#![allow(dead_code)]

use axum_test::TestServer;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use latch_auth::{
    seed_permissions, seed_super_user, AccessGuard, AuthConfig, AuthService, BcryptHasher,
    PasswordHasher, SigningKey, TokenCodec,
};
use latch_core::{PermissionCode, SuperUserProfile};
use latch_storage::{DatabaseConfig, DatabaseConnection, SeaOrmAuthRepository};
use latch_web::{app_router, AppState, CookieSettings, LoginRateLimiter, RouterConfig};

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "Sup3r!Pass";

const PRIVATE_KEY: &[u8] = include_bytes!("../../../latch-auth/tests/fixtures/rsa_pkcs1.pem");

pub struct TestApp {
    _temp_dir: TempDir,
    pub server: TestServer,
    pub repository: Arc<SeaOrmAuthRepository>,
}

pub struct TestAppOptions {
    pub cookie_domains: Vec<String>,
    pub login_rate_limit: u32,
}

impl Default for TestAppOptions {
    fn default() -> Self {
        Self {
            cookie_domains: Vec::new(),
            login_rate_limit: 1_000,
        }
    }
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_options(TestAppOptions::default()).await
    }

    pub async fn with_options(options: TestAppOptions) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config = DatabaseConfig {
            url: format!(
                "sqlite://{}?mode=rwc",
                temp_dir.path().join("latch-web.db").display()
            ),
            max_connections: 1,
            connection_timeout: Duration::from_secs(5),
        };
        let connection = DatabaseConnection::new(config).await.unwrap();
        connection.migrate().await.unwrap();
        let repository = Arc::new(SeaOrmAuthRepository::new(connection));

        let hasher: Arc<dyn PasswordHasher> = Arc::new(BcryptHasher::new(4));
        seed_permissions(repository.as_ref(), &PermissionCode::ALL)
            .await
            .unwrap();
        seed_super_user(
            repository.as_ref(),
            SuperUserProfile {
                first_name: "Ada".to_string(),
                last_name: "Admin".to_string(),
                email: ADMIN_EMAIL.to_string(),
                password_hash: hasher.hash(ADMIN_PASSWORD).unwrap(),
            },
        )
        .await
        .unwrap();

        let codec = Arc::new(TokenCodec::new(
            SigningKey::from_pem(PRIVATE_KEY).unwrap(),
            "latch-test",
        ));
        let service = AuthService::new(
            repository.clone(),
            codec.clone(),
            hasher.clone(),
            AuthConfig::default(),
        );
        let state = AppState::new(
            service,
            AccessGuard::new(codec),
            hasher,
            CookieSettings::new(options.cookie_domains),
            LoginRateLimiter::new(options.login_rate_limit),
        );

        let router = app_router(state, &RouterConfig::default());
        let server = TestServer::new(router).unwrap();

        Self {
            _temp_dir: temp_dir,
            server,
            repository,
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Value {
        let response = self
            .server
            .post("/auth/login")
            .json(&json!({ "email": email, "password": password }))
            .await;
        response.assert_status_ok();
        response.json::<Value>()
    }

    pub async fn admin_token(&self) -> String {
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await["access_token"]
            .as_str()
            .unwrap()
            .to_string()
    }

    /// Create a user through the API and return its id
    pub async fn create_user(&self, token: &str, email: &str, role_ids: &[i32]) -> i64 {
        let response = self
            .server
            .post("/users")
            .authorization_bearer(token)
            .json(&json!({
                "first_name": "Mia",
                "last_name": "Member",
                "email": email,
                "password": "Memb3r!Pass",
                "role_ids": role_ids,
            }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json::<Value>()["id"].as_i64().unwrap()
    }

    pub async fn permission_id(&self, token: &str, code: &str) -> i64 {
        let page = self
            .server
            .get("/permissions")
            .authorization_bearer(token)
            .add_query_param("limit", 50)
            .await
            .json::<Value>();
        page["data"]
            .as_array()
            .unwrap()
            .iter()
            .find(|p| p["code"] == code)
            .and_then(|p| p["id"].as_i64())
            .unwrap()
    }
}

/// Sleep until the wall clock has entered the next whole second
pub async fn next_second() {
    let into_second = u64::from(chrono::Utc::now().timestamp_subsec_millis().min(999));
    tokio::time::sleep(Duration::from_millis(1_000 - into_second + 10)).await;
}
