//! # Latch Storage
//!
//! Sea-ORM persistence for the auth store: entities, migrations, the
//! connection wrapper and the [`SeaOrmAuthRepository`] implementation of the
//! `latch-core` repository contracts.

pub mod config;
pub mod connection;
pub mod entities;
pub mod migrations;
pub mod repository;

pub use config::DatabaseConfig;
pub use connection::{DatabaseConnection, StorageError};
pub use migrations::Migrator;
pub use repository::{SeaOrmAuthRepository, SeaOrmUnitOfWork};
