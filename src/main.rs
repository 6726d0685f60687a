use std::path::Path;

use anyhow::anyhow;
use clap::Parser;

use contact_ingest::Settings;
use contact_ingest::cli::commands::{ingest, init, list, show, watch};
use contact_ingest::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        // Init runs before any settings file exists
        Commands::Init { force } => {
            contact_ingest::logging::init();
            init::run_init(force)
        }
        Commands::Config => init::run_config(&load_settings(config_path)?),
        Commands::Watch { dir, scan } => {
            let settings = load_settings(config_path)?;
            watch::run(watch::WatchArgs { dir, scan }, &settings).await
        }
        Commands::Ingest { files } => ingest::run(&files, &load_settings(config_path)?),
        Commands::Show { id } => show::run(id, &load_settings(config_path)?),
        Commands::List {
            name,
            email,
            limit,
            offset,
        } => list::run(
            list::ListArgs {
                name,
                email,
                limit,
                offset,
            },
            &load_settings(config_path)?,
        ),
    }
}

/// Load settings and start logging with them.
fn load_settings(config: Option<&Path>) -> anyhow::Result<Settings> {
    let settings = match config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
    .map_err(|e| anyhow!("Configuration error: {e}"))?;

    contact_ingest::logging::init_with_config(&settings.logging);
    Ok(settings)
}
