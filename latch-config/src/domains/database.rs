//! Database configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigResult;
use crate::validation::{validate_positive, validate_url, Validatable};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database URL, e.g. `sqlite://latch.db?mode=rwc`
    pub url: String,

    pub max_connections: u32,

    #[serde(with = "crate::domains::utils::serde_duration")]
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

impl Validatable for DatabaseConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_url(&self.url, "url", self.domain_name())?;
        validate_positive(self.max_connections, "max_connections", self.domain_name())?;
        validate_positive(
            self.connection_timeout.as_secs(),
            "connection_timeout",
            self.domain_name(),
        )?;

        if self.url.contains(":memory:") && self.max_connections > 1 {
            return Err(self.validation_error(
                "in-memory SQLite requires max_connections = 1",
            ));
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "database"
    }
}
