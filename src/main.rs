use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use broker_import::cli::Cli;
use broker_import::config::ImportConfig;
use broker_import::dispatcher::dispatch_command;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so --json output stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .with_ansi(!cli.no_color)
        .init();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let config = ImportConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    dispatch_command(cli.command, &config, cli.json).await
}
