//! sidecars - sidecar binary provisioning CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use sidecar_cli::cmd;
use sidecar_cli::{Cli, Commands};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over -v
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = cmd::load_config(&cli)?;

    match &cli.command {
        Commands::Fetch(args) => cmd::fetch::fetch(config, args, cli.quiet).await,
        Commands::Plan(args) => cmd::plan::plan(config, args),
        Commands::Catalog => cmd::catalog::catalog(&config),
    }
}
