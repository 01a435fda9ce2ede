//! # Latch Config
//!
//! Configuration for the Latch server, loaded from YAML and `LATCH_*`
//! environment variables and validated per domain.

pub mod domains;
pub mod error;
pub mod loader;
pub mod validation;

pub use domains::auth::AuthConfig;
pub use domains::database::DatabaseConfig;
pub use domains::logging::{LogFormat, LogLevel, LoggingConfig};
pub use domains::server::ServerConfig;
pub use domains::super_user::SuperUserConfig;
pub use domains::LatchConfig;
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use validation::Validatable;
