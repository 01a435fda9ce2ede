use std::time::Duration;

/// Connection settings for the auth store
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database URL, e.g. `sqlite://latch.db?mode=rwc`
    pub url: String,
    /// Maximum number of pooled connections
    pub max_connections: u32,
    /// Timeout for establishing and acquiring connections
    pub connection_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://latch.db?mode=rwc".to_string(),
            max_connections: 10,
            connection_timeout: Duration::from_secs(30),
        }
    }
}
