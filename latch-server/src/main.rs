//! Latch Server Binary

use anyhow::Result;
use clap::Parser;

use latch_config::ConfigLoader;
use latch_server::{logging, Cli, Server};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ConfigLoader::new().load(cli.config.as_ref())?;
    cli.apply_overrides(&mut config)?;

    if cli.print_config {
        print!("{}", config.to_redacted_yaml()?);
        return Ok(());
    }

    logging::init_logging(&config.logging)?;

    let server = Server::new(config).await?;
    server.start().await
}
