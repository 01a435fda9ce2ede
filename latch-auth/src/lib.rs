//! # Latch Auth
//!
//! Credential handling and the auth service:
//!
//! - **Keys**: RSA key loading from PEM or base64 DER
//! - **Token**: RS256 signing and verification of [`latch_core::Claims`]
//! - **Password**: bcrypt hashing and the password policy
//! - **Service**: login, token issue/refresh, user and role management
//! - **Guard**: request-boundary token verification and authorization
//! - **Seed**: idempotent startup seeding

pub mod config;
pub mod guard;
pub mod keys;
pub mod password;
pub mod seed;
pub mod service;
pub mod token;

pub use config::AuthConfig;
pub use guard::{select_credential, AccessGuard};
pub use keys::{SigningKey, VerifyingKey};
pub use password::{validate_password_policy, BcryptHasher, PasswordHasher, DEFAULT_COST};
pub use seed::{seed_permissions, seed_super_user};
pub use service::{normalize_email, AuthService, TokenPair, UpdatePath};
pub use token::TokenCodec;
