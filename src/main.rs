use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use topicsource::cli::{self, Commands};
use topicsource::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // `serve` logs through tracing, which also picks up `log` records
    match &cli.command {
        Commands::Serve(_) => topicsource::server::init_logging(),
        _ => env_logger::init(),
    }

    // Load configuration
    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;

    info!("Configuration loaded: {} sources", config.sources.len());

    // Dispatch commands
    match &cli.command {
        Commands::List(cmd) => cli::list::handle(cmd, &config)?,
        Commands::Check(cmd) => cli::check::handle(cmd, &config).await?,
        Commands::Topics(cmd) => cli::topics::handle(cmd, &config).await?,
        Commands::Data(cmd) => cli::data::handle(cmd, &config).await?,
        Commands::Serve(cmd) => cli::serve::handle(cmd, &config).await?,
    }

    Ok(())
}
