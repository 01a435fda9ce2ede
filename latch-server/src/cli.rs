//! Command line interface

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use latch_config::LatchConfig;

#[derive(Parser, Debug)]
#[command(author, version, about = "Latch authentication server", long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Server bind address, `host` or `host:port`
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Database URL
    #[arg(long)]
    pub database_url: Option<String>,

    /// Print the effective configuration with secrets redacted and exit
    #[arg(long)]
    pub print_config: bool,
}

impl Cli {
    /// Apply CLI argument overrides on top of file and environment settings
    pub fn apply_overrides(&self, config: &mut LatchConfig) -> Result<()> {
        if let Some(bind) = &self.bind {
            match bind.rsplit_once(':') {
                Some((host, port)) if !host.ends_with(':') => {
                    config.server.bind_address = host.to_string();
                    config.server.port = port
                        .parse()
                        .map_err(|e| anyhow::anyhow!("Invalid bind address '{}': {}", bind, e))?;
                }
                _ => config.server.bind_address = bind.clone(),
            }
        }

        if let Some(url) = &self.database_url {
            config.database.url = url.clone();
        }

        config.validate_all()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arguments() {
        let cli = Cli::try_parse_from([
            "latch-server",
            "--config",
            "latch.yaml",
            "--bind",
            "127.0.0.1:9000",
            "--print-config",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("latch.yaml")));
        assert_eq!(cli.bind.as_deref(), Some("127.0.0.1:9000"));
        assert!(cli.database_url.is_none());
        assert!(cli.print_config);
    }

    fn config_with_key() -> LatchConfig {
        let mut config = LatchConfig::default();
        config.auth.private_key_path = Some(PathBuf::from("/etc/latch/key.pem"));
        config
    }

    #[test]
    fn test_bind_override_with_port() {
        let cli = Cli::try_parse_from(["latch-server", "--bind", "127.0.0.1:9000"]).unwrap();
        let mut config = config_with_key();
        cli.apply_overrides(&mut config).unwrap();

        assert_eq!(config.server.bind_address, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_bind_override_host_only() {
        let cli = Cli::try_parse_from(["latch-server", "-b", "localhost"]).unwrap();
        let mut config = config_with_key();
        cli.apply_overrides(&mut config).unwrap();

        assert_eq!(config.server.bind_address, "localhost");
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let cli = Cli::try_parse_from(["latch-server", "--bind", "127.0.0.1:http"]).unwrap();
        assert!(cli.apply_overrides(&mut config_with_key()).is_err());
    }

    #[test]
    fn test_database_override_is_validated() {
        let cli = Cli::try_parse_from(["latch-server", "--database-url", "sqlite::memory:"]).unwrap();
        // The default pool size is too large for an in-memory database
        assert!(cli.apply_overrides(&mut config_with_key()).is_err());

        let mut config = config_with_key();
        config.database.max_connections = 1;
        cli.apply_overrides(&mut config).unwrap();
        assert_eq!(config.database.url, "sqlite::memory:");
    }
}
