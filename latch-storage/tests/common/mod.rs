//! Shared setup for storage integration tests

#![allow(dead_code)]

use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use latch_core::NewUser;
use latch_storage::entities::tenants;
use latch_storage::{DatabaseConfig, DatabaseConnection, SeaOrmAuthRepository};

/// Migrated SQLite database in a temporary directory
pub struct TestDatabase {
    _temp_dir: TempDir,
    pub connection: DatabaseConnection,
    pub repository: Arc<SeaOrmAuthRepository>,
}

impl TestDatabase {
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("latch-test.db");

        let config = DatabaseConfig {
            url: format!("sqlite://{}?mode=rwc", db_path.display()),
            max_connections: 1,
            connection_timeout: Duration::from_secs(5),
        };

        let connection = DatabaseConnection::new(config).await.unwrap();
        connection.migrate().await.unwrap();
        let repository = Arc::new(SeaOrmAuthRepository::new(connection.clone()));

        Self {
            _temp_dir: temp_dir,
            connection,
            repository,
        }
    }

    /// Insert a tenant directly; the service has no tenant management
    pub async fn insert_tenant(&self, name: &str) -> i32 {
        let now = Utc::now();
        let model = tenants::ActiveModel {
            name: Set(name.to_string()),
            description: Set(None),
            active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
            ..Default::default()
        }
        .insert(self.connection.get_connection())
        .await
        .unwrap();
        model.id
    }
}

pub fn new_user(email: &str, password_hash: &str) -> NewUser {
    NewUser {
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        email: email.to_string(),
        password_hash: password_hash.to_string(),
        active: true,
        ..Default::default()
    }
}

/// Sleep until the wall clock has entered the next whole second.
/// Token `iat` values have one-second resolution.
pub async fn next_second() {
    let into_second = u64::from(Utc::now().timestamp_subsec_millis().min(999));
    tokio::time::sleep(Duration::from_millis(1_000 - into_second + 10)).await;
}
