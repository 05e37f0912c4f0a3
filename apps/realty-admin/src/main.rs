mod commands;
mod config;
mod logging;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::Value;

use crate::commands::{Clients, ExportArgs, GridArgs, MutateArgs};
use crate::config::AppConfig;

/// Realty Admin - command-line access to the admin API
#[derive(Parser)]
#[command(name = "realty-admin")]
#[command(about = "Realty Admin - command-line access to the admin API")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// API base URL (overrides config)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Print effective configuration (YAML) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a grid page (or every page with --all)
    Grid(GridArgs),
    /// Download a binary export
    Export(ExportArgs),
    /// Create, update or delete a resource
    Mutate(MutateArgs),
    /// Validate configuration and exit
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config
        && !Path::new(path).is_file()
    {
        anyhow::bail!("config file does not exist: {}", path.display());
    }

    // 1) defaults -> 2) YAML (if provided) -> 3) env (REALTY__*) -> 4) CLI overrides
    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_cli_overrides(cli.base_url.as_deref(), cli.verbose);

    logging::init(&config.logging)?;

    if cli.print_config {
        println!("Effective configuration:\n{}", config.to_redacted_yaml()?);
        return Ok(());
    }

    let Some(command) = cli.command else {
        anyhow::bail!("no command given, see --help");
    };

    if matches!(command, Commands::Check) {
        return check_config(&config);
    }

    let clients = Clients::from_config(&config)?;
    let output = match command {
        Commands::Grid(args) => args.execute(&clients).await?,
        Commands::Export(args) => args.execute(&clients).await?,
        Commands::Mutate(args) => args.execute(&clients).await?,
        Commands::Check => Value::Null,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn check_config(config: &AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");
    let clients = Clients::from_config(config)?;
    println!("Configuration is valid");
    println!(
        "Session: {}",
        if clients.session.is_signed_in() {
            "signed in"
        } else {
            "signed out"
        }
    );
    println!("{}", config.to_redacted_yaml()?);
    Ok(())
}
