//! ExtentCache CLI
//!
//! Command-line access to the extent cache configuration, plus a simulator
//! that drives a span governor and the data registry end to end.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use extentcache::config::{ConfigFile, DEFAULT_LOG_FILE};
use extentcache::logging::{init_logging, LoggingGuard};
use tracing::info;

use commands::config::ConfigCommands;
use commands::simulate::SimulateArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "extentcache")]
#[command(about = "Interval-indexed data cache with coalesced provider fetches", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the configuration file (defaults to ~/.extentcache/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Write logs to the configured log directory and to stdout
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage configuration settings
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Load and clear spans against a synthetic provider and report what was fetched
    Simulate(SimulateArgs),
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        e.exit();
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Config(command) => commands::config::run(command, cli.config),
        Commands::Simulate(args) => {
            let config = match &cli.config {
                Some(path) => ConfigFile::load_from(path)?,
                None => ConfigFile::load()?,
            };
            let _guard = if cli.verbose {
                Some(start_logging(&config)?)
            } else {
                None
            };
            commands::simulate::run(args, &config)
        }
    }
}

fn start_logging(config: &ConfigFile) -> Result<LoggingGuard, CliError> {
    let file = if config.logging.file.is_empty() {
        DEFAULT_LOG_FILE
    } else {
        config.logging.file.as_str()
    };
    let guard = init_logging(&config.logging.directory, file)
        .map_err(|e| CliError::LoggingInit(e.to_string()))?;
    info!(
        log = %config.logging.directory.join(file).display(),
        "ExtentCache {} starting",
        env!("CARGO_PKG_VERSION")
    );
    Ok(guard)
}
