//! Configuration loading and environment variable handling

use log::debug;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::domains::auth::AuthConfig;
use crate::domains::database::DatabaseConfig;
use crate::domains::logging::{LogFormat, LogLevel, LoggingConfig};
use crate::domains::server::ServerConfig;
use crate::domains::super_user::SuperUserConfig;
use crate::domains::LatchConfig;
use crate::error::{ConfigError, ConfigResult};

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with the `LATCH` prefix
    pub fn new() -> Self {
        Self {
            prefix: "LATCH".to_string(),
        }
    }

    /// Create a new config loader with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load configuration from a YAML file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<LatchConfig> {
        debug!("Loading configuration from {}", path.as_ref().display());
        let content = std::fs::read_to_string(path)?;
        let mut config: LatchConfig = serde_yaml::from_str(&content)?;

        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<LatchConfig> {
        let mut config = LatchConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load from `config_path` when given, else from the environment alone
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<LatchConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&self, config: &mut LatchConfig) -> ConfigResult<()> {
        self.apply_server_overrides(&mut config.server)?;
        self.apply_database_overrides(&mut config.database)?;
        self.apply_auth_overrides(&mut config.auth)?;
        self.apply_super_user_overrides(&mut config.super_user)?;
        self.apply_logging_overrides(&mut config.logging)?;
        Ok(())
    }

    fn apply_server_overrides(&self, config: &mut ServerConfig) -> ConfigResult<()> {
        if let Some(bind) = self.get_env_var("SERVER_BIND_ADDRESS") {
            config.bind_address = bind;
        }

        if let Some(port) = self.get_env_var("SERVER_PORT") {
            config.port = parse_var("SERVER_PORT", &port)?;
        }

        if let Some(limit) = self.get_env_var("SERVER_LOGIN_RATE_LIMIT") {
            config.login_rate_limit = parse_var("SERVER_LOGIN_RATE_LIMIT", &limit)?;
        }

        Ok(())
    }

    fn apply_database_overrides(&self, config: &mut DatabaseConfig) -> ConfigResult<()> {
        if let Some(url) = self.get_env_var("DATABASE_URL") {
            config.url = url;
        }

        if let Some(max) = self.get_env_var("DATABASE_MAX_CONNECTIONS") {
            config.max_connections = parse_var("DATABASE_MAX_CONNECTIONS", &max)?;
        }

        Ok(())
    }

    fn apply_auth_overrides(&self, config: &mut AuthConfig) -> ConfigResult<()> {
        if let Some(issuer) = self.get_env_var("AUTH_ISSUER") {
            config.issuer = issuer;
        }

        // An environment key source replaces whatever the file configured
        if let Some(path) = self.get_env_var("AUTH_PRIVATE_KEY_PATH") {
            config.private_key_path = Some(PathBuf::from(path));
            config.private_key_base64 = None;
        }

        if let Some(encoded) = self.get_env_var("AUTH_PRIVATE_KEY") {
            config.private_key_base64 = Some(encoded);
            config.private_key_path = None;
        }

        if let Some(ttl) = self.get_env_var("AUTH_ACCESS_TTL") {
            config.access_token_ttl = Duration::from_secs(parse_var("AUTH_ACCESS_TTL", &ttl)?);
        }

        if let Some(ttl) = self.get_env_var("AUTH_REFRESH_TTL") {
            config.refresh_token_ttl = Duration::from_secs(parse_var("AUTH_REFRESH_TTL", &ttl)?);
        }

        if let Some(domains) = self.get_env_var("AUTH_COOKIE_DOMAINS") {
            config.cookie_domains = domains
                .split(',')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(String::from)
                .collect();
        }

        Ok(())
    }

    fn apply_super_user_overrides(&self, config: &mut Option<SuperUserConfig>) -> ConfigResult<()> {
        let email = self.get_env_var("SUPER_USER_EMAIL");
        let password = self.get_env_var("SUPER_USER_PASSWORD");

        if let Some(existing) = config.as_mut() {
            if let Some(email) = email {
                existing.email = email;
            }
            if let Some(password) = password {
                existing.password = password;
            }
            return Ok(());
        }

        match (email, password) {
            (Some(email), Some(password)) => {
                *config = Some(SuperUserConfig {
                    first_name: "Super".to_string(),
                    last_name: "User".to_string(),
                    email,
                    password,
                });
                Ok(())
            }
            (None, None) => Ok(()),
            _ => Err(ConfigError::EnvError(format!(
                "{0}_SUPER_USER_EMAIL and {0}_SUPER_USER_PASSWORD must be set together",
                self.prefix
            ))),
        }
    }

    fn apply_logging_overrides(&self, config: &mut LoggingConfig) -> ConfigResult<()> {
        if let Some(level) = self.get_env_var("LOG_LEVEL") {
            config.level = Some(
                LogLevel::from_str(&level)
                    .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_LEVEL: {}", level)))?,
            );
        }

        if let Some(format) = self.get_env_var("LOG_FORMAT") {
            config.format = LogFormat::from_str(&format)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_FORMAT: {}", format)))?;
        }

        Ok(())
    }

    /// Get environment variable with prefix
    fn get_env_var(&self, name: &str) -> Option<String> {
        let key = format!("{}_{}", self.prefix, name);
        let value = std::env::var(&key).ok()?;
        debug!("Applying environment override {}", key);
        Some(value)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_var<T>(name: &str, value: &str) -> ConfigResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| ConfigError::EnvError(format!("Invalid {}: {}", name, e)))
}
