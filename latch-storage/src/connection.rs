use sea_orm::{ConnectOptions, Database, DatabaseConnection as SeaConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::migrations::Migrator;

/// Database connection wrapper with configuration
#[derive(Clone)]
pub struct DatabaseConnection {
    connection: SeaConnection,
    config: DatabaseConfig,
}

/// Storage setup errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Db(#[from] DbErr),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl DatabaseConnection {
    /// Create a new database connection with configuration
    pub async fn new(config: DatabaseConfig) -> Result<Self, StorageError> {
        info!("Connecting to database: {}", redact(&config.url));

        if config.url.contains(":memory:") && config.max_connections > 1 {
            return Err(StorageError::Config(
                "in-memory SQLite needs max_connections = 1".to_string(),
            ));
        }

        let mut opts = ConnectOptions::new(&config.url);
        opts.max_connections(config.max_connections)
            .min_connections(1)
            .connect_timeout(config.connection_timeout)
            .acquire_timeout(config.connection_timeout)
            .idle_timeout(Duration::from_secs(300))
            .sqlx_logging(true)
            .sqlx_logging_level(log::LevelFilter::Debug);

        let connection = Database::connect(opts).await?;

        debug!(
            "Database connection established with {} max connections",
            config.max_connections
        );

        Ok(Self { connection, config })
    }

    /// Get the underlying Sea-ORM connection
    pub fn get_connection(&self) -> &SeaConnection {
        &self.connection
    }

    pub fn get_config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Apply pending migrations
    pub async fn migrate(&self) -> Result<(), StorageError> {
        info!("Running database migrations");

        Migrator::up(&self.connection, None)
            .await
            .map_err(|e| StorageError::Migration(e.to_string()))?;

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Check database connectivity
    pub async fn ping(&self) -> Result<(), StorageError> {
        self.connection.ping().await.map_err(|e| {
            debug!("Database ping failed: {}", e);
            StorageError::Db(e)
        })
    }

    pub async fn close(self) -> Result<(), StorageError> {
        info!("Closing database connection");
        self.connection.close().await?;
        Ok(())
    }
}

/// Hide credentials embedded in a connection URL
fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}
