//! HTTP server configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigResult;
use crate::validation::{validate_positive, validate_required_string, Validatable};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_address: String,

    pub port: u16,

    /// Upper bound on handling a single request
    #[serde(with = "crate::domains::utils::serde_duration")]
    pub request_timeout: Duration,

    /// Login attempts allowed per client address per minute
    pub login_rate_limit: u32,

    /// Origins allowed by CORS. Empty means no cross-origin access.
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout: Duration::from_secs(30),
            login_rate_limit: 10,
            cors_allowed_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// `bind_address:port`
    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

impl Validatable for ServerConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.bind_address, "bind_address", self.domain_name())?;
        validate_positive(self.port, "port", self.domain_name())?;
        validate_positive(
            self.request_timeout.as_secs(),
            "request_timeout",
            self.domain_name(),
        )?;
        validate_positive(self.login_rate_limit, "login_rate_limit", self.domain_name())?;

        if self.cors_allowed_origins.iter().any(|o| o == "*") {
            return Err(self.validation_error(
                "wildcard CORS origin cannot be combined with credentialed cookies",
            ));
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "server"
    }
}
