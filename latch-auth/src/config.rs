//! Token lifetime settings

use std::time::Duration;

use latch_core::TokenType;

/// Resolved token settings handed to the auth service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// Value of the `iss` claim
    pub issuer: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: "latch".to_string(),
            access_token_ttl: Duration::from_secs(15 * 60),
            refresh_token_ttl: Duration::from_secs(7 * 24 * 60 * 60),
        }
    }
}

impl AuthConfig {
    /// Lifetime of a token of the given type
    pub fn ttl(&self, token_type: TokenType) -> Duration {
        match token_type {
            TokenType::Access => self.access_token_ttl,
            TokenType::Refresh => self.refresh_token_ttl,
        }
    }
}
