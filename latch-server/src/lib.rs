//! # Latch Server
//!
//! Bootstrap for the Latch auth service: loads configuration, prepares the
//! store and keys, seeds permissions and the super-user, then serves the API.

pub mod cli;
pub mod logging;
pub mod startup;

pub use cli::Cli;
pub use startup::Server;
