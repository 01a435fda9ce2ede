//! Password hashing and policy

use latch_core::{AuthError, AuthResult};

pub use bcrypt::DEFAULT_COST;

/// One-way password hashing capability
#[cfg_attr(test, mockall::automock)]
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> AuthResult<String>;

    /// Returns false for a mismatch or an unreadable hash, never an error
    fn verify(&self, plaintext: &str, hash: &str) -> bool;
}

/// bcrypt with a configurable cost factor
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(DEFAULT_COST)
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, plaintext: &str) -> AuthResult<String> {
        bcrypt::hash(plaintext, self.cost).map_err(|e| AuthError::hashing(e.to_string()))
    }

    fn verify(&self, plaintext: &str, hash: &str) -> bool {
        bcrypt::verify(plaintext, hash).unwrap_or(false)
    }
}

pub const MIN_PASSWORD_LENGTH: usize = 8;
/// Upper bound in characters
pub const MAX_PASSWORD_LENGTH: usize = 64;
/// bcrypt only reads the first 72 bytes of its input
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Reject passwords that are too short, too long, or lack an uppercase letter,
/// a lowercase letter, a digit or a symbol.
pub fn validate_password_policy(password: &str) -> AuthResult<()> {
    let length = password.chars().count();
    if !(MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&length) {
        return Err(AuthError::validation(format!(
            "password must be between {} and {} characters",
            MIN_PASSWORD_LENGTH, MAX_PASSWORD_LENGTH
        )));
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(AuthError::validation(format!(
            "password must not exceed {} bytes",
            MAX_PASSWORD_BYTES
        )));
    }

    let mut missing = Vec::new();
    if !password.chars().any(char::is_uppercase) {
        missing.push("an uppercase letter");
    }
    if !password.chars().any(char::is_lowercase) {
        missing.push("a lowercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        missing.push("a digit");
    }
    if !password
        .chars()
        .any(|c| c.is_ascii_punctuation() || (!c.is_alphanumeric() && !c.is_whitespace()))
    {
        missing.push("a symbol");
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AuthError::validation(format!(
            "password must contain {}",
            missing.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Lowest cost bcrypt accepts keeps the tests fast
    fn hasher() -> BcryptHasher {
        BcryptHasher::new(4)
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = hasher();
        let hash = hasher.hash("Sup3r!Pass").unwrap();

        assert_ne!(hash, "Sup3r!Pass");
        assert!(hasher.verify("Sup3r!Pass", &hash));
        assert!(!hasher.verify("sup3r!pass", &hash));
    }

    #[test]
    fn test_verify_with_malformed_hash_is_false() {
        assert!(!hasher().verify("Sup3r!Pass", "not-a-bcrypt-hash"));
        assert!(!hasher().verify("Sup3r!Pass", ""));
    }

    #[test]
    fn test_invalid_cost_is_hashing_error() {
        assert!(matches!(
            BcryptHasher::new(99).hash("Sup3r!Pass"),
            Err(AuthError::Hashing { .. })
        ));
    }

    #[test]
    fn test_password_policy() {
        assert!(validate_password_policy("Sup3r!Pass").is_ok());
        assert!(validate_password_policy("Sh0rt!").is_err());
        assert!(validate_password_policy("alllowercase1!").is_err());
        assert!(validate_password_policy("NoDigitsHere!").is_err());
        assert!(validate_password_policy("NoSymbols123").is_err());
        assert!(validate_password_policy(&format!("Aa1!{}", "x".repeat(70))).is_err());
    }

    #[test]
    fn test_multibyte_password_is_capped_in_bytes() {
        // 44 characters but 84 bytes
        let accented = format!("Aa1!{}", "é".repeat(40));
        let err = validate_password_policy(&accented).unwrap_err();
        assert!(err.to_string().contains("72 bytes"));

        // 34 characters, 64 bytes
        assert!(validate_password_policy(&format!("Aa1!{}", "é".repeat(30))).is_ok());
    }

    #[test]
    fn test_policy_reports_every_missing_class() {
        let err = validate_password_policy("lowercaseonly").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("uppercase"));
        assert!(message.contains("digit"));
        assert!(message.contains("symbol"));
    }
}
