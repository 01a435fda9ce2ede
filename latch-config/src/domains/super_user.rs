//! Bootstrap super-user

use serde::{Deserialize, Serialize};

use crate::error::ConfigResult;
use crate::validation::{validate_email, validate_required_string, Validatable};

/// Account created at startup when no user with `email` exists.
/// The password is hashed before it reaches the store.
#[derive(Clone, Serialize, Deserialize)]
pub struct SuperUserConfig {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for SuperUserConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuperUserConfig")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Validatable for SuperUserConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.first_name, "first_name", self.domain_name())?;
        validate_required_string(&self.last_name, "last_name", self.domain_name())?;
        validate_email(&self.email, "email", self.domain_name())?;
        validate_required_string(&self.password, "password", self.domain_name())
    }

    fn domain_name(&self) -> &'static str {
        "super_user"
    }
}
