//! Configuration domains

pub mod auth;
pub mod database;
pub mod logging;
pub mod server;
pub mod super_user;
pub mod utils;

use serde::{Deserialize, Serialize};

use crate::error::ConfigResult;
use crate::validation::Validatable;

/// Complete Latch configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LatchConfig {
    pub server: server::ServerConfig,

    pub database: database::DatabaseConfig,

    pub auth: auth::AuthConfig,

    /// Seeded at startup when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub super_user: Option<super_user::SuperUserConfig>,

    pub logging: logging::LoggingConfig,
}

impl LatchConfig {
    /// Validate every domain
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.server.validate()?;
        self.database.validate()?;
        self.auth.validate()?;
        if let Some(super_user) = &self.super_user {
            super_user.validate()?;
        }
        self.logging.validate()?;
        Ok(())
    }

    /// Render as YAML with secrets blanked
    pub fn to_redacted_yaml(&self) -> ConfigResult<String> {
        let mut copy = self.clone();
        if copy.auth.private_key_base64.is_some() {
            copy.auth.private_key_base64 = Some("<redacted>".to_string());
        }
        if let Some(super_user) = copy.super_user.as_mut() {
            super_user.password = "<redacted>".to_string();
        }
        Ok(serde_yaml::to_string(&copy)?)
    }
}
