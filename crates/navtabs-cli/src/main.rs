//! navtabs CLI - inspect and migrate navigation tab storage
//!
//! Provides `navtabs record`, `navtabs migrate`, `navtabs profile`, and
//! `navtabs tabs` over a data directory holding one JSON file per storage
//! area.

mod commands;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use navtabs_core::config::{StoreConfig, CONFIG_FILE_NAME};
use navtabs_core::storage::FileBackend;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use commands::migrate::MigrateCommands;
use commands::profile::ProfileCommands;
use commands::record::RecordCommands;
use commands::tabs::TabsCommands;
use commands::Context;

#[derive(Parser)]
#[command(name = "navtabs")]
#[command(about = "navtabs - navigation tab storage and migration tool")]
#[command(version)]
struct Cli {
    /// Directory holding synced.json and local.json (defaults to ~/.navtabs)
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Config file (defaults to <DIR>/navtabs.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read, write, and inspect chunked records
    Record {
        #[command(subcommand)]
        action: RecordCommands,
    },
    /// Detect and run the legacy tab migration
    Migrate {
        #[command(subcommand)]
        action: MigrateCommands,
    },
    /// Manage profiles
    Profile {
        #[command(subcommand)]
        action: ProfileCommands,
    },
    /// Show the active tab list
    Tabs {
        #[command(subcommand)]
        action: TabsCommands,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose)?;

    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };
    let config_path = cli
        .config
        .unwrap_or_else(|| data_dir.join(CONFIG_FILE_NAME));
    let config = StoreConfig::load_or_default(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    tracing::debug!(data_dir = %data_dir.display(), "opening storage");
    let ctx = Context {
        storage: FileBackend::storage(&data_dir),
        config,
    };

    match cli.command {
        Commands::Record { action } => commands::record::execute(action, &ctx).await,
        Commands::Migrate { action } => commands::migrate::execute(action, &ctx).await,
        Commands::Profile { action } => commands::profile::execute(action, &ctx).await,
        Commands::Tabs { action } => commands::tabs::execute(action, &ctx).await,
    }
}

fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(format!("navtabs_cli={level}").parse()?)
                .add_directive(format!("navtabs_core={level}").parse()?),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn default_data_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine the home directory")?;
    Ok(home.join(".navtabs"))
}
