//! Token and credential configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigResult;
use crate::validation::{validate_positive, validate_required_string, Validatable};

/// bcrypt's default work factor
pub const DEFAULT_BCRYPT_COST: u32 = 12;

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// `iss` claim written into and required from every token
    pub issuer: String,

    /// PEM file holding the RSA private key (PKCS#1 or PKCS#8)
    pub private_key_path: Option<PathBuf>,

    /// Base64 DER of the RSA private key
    pub private_key_base64: Option<String>,

    /// Derived from the private key when neither public source is set
    pub public_key_path: Option<PathBuf>,

    pub public_key_base64: Option<String>,

    #[serde(with = "crate::domains::utils::serde_duration")]
    pub access_token_ttl: Duration,

    #[serde(with = "crate::domains::utils::serde_duration")]
    pub refresh_token_ttl: Duration,

    /// Domains that receive token cookies on login and refresh
    pub cookie_domains: Vec<String>,

    pub bcrypt_cost: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: "latch".to_string(),
            private_key_path: None,
            private_key_base64: None,
            public_key_path: None,
            public_key_base64: None,
            access_token_ttl: Duration::from_secs(15 * 60),
            refresh_token_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            cookie_domains: Vec::new(),
            bcrypt_cost: DEFAULT_BCRYPT_COST,
        }
    }
}

// Key material stays out of debug output.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("issuer", &self.issuer)
            .field("private_key_path", &self.private_key_path)
            .field(
                "private_key_base64",
                &self.private_key_base64.as_ref().map(|_| "<redacted>"),
            )
            .field("public_key_path", &self.public_key_path)
            .field("public_key_base64", &self.public_key_base64.is_some())
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("cookie_domains", &self.cookie_domains)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish()
    }
}

impl Validatable for AuthConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.issuer, "issuer", self.domain_name())?;
        validate_positive(
            self.access_token_ttl.as_secs(),
            "access_token_ttl",
            self.domain_name(),
        )?;
        validate_positive(
            self.refresh_token_ttl.as_secs(),
            "refresh_token_ttl",
            self.domain_name(),
        )?;

        if self.access_token_ttl >= self.refresh_token_ttl {
            return Err(self.validation_error(
                "access_token_ttl must be shorter than refresh_token_ttl",
            ));
        }

        match (&self.private_key_path, &self.private_key_base64) {
            (Some(_), Some(_)) => {
                return Err(self.validation_error(
                    "set only one of private_key_path and private_key_base64",
                ))
            }
            (None, None) => {
                return Err(self.validation_error(
                    "a private key is required (private_key_path or private_key_base64)",
                ))
            }
            _ => {}
        }

        if self.public_key_path.is_some() && self.public_key_base64.is_some() {
            return Err(self.validation_error(
                "set only one of public_key_path and public_key_base64",
            ));
        }

        if !(4..=31).contains(&self.bcrypt_cost) {
            return Err(self.validation_error(format!(
                "bcrypt_cost must be between 4 and 31, got {}",
                self.bcrypt_cost
            )));
        }

        if self.cookie_domains.iter().any(|d| d.trim().is_empty()) {
            return Err(self.validation_error("cookie_domains cannot contain empty entries"));
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "auth"
    }
}
