//! Seascore CLI - regatta standings from the command line.

mod commands;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use seascore::logging::{init_logging, LoggingConfig};

use commands::config::ConfigCommands;
use commands::standings::StandingsArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "seascore", version, about = "Sailing regatta scoring and standings")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the standings of a regatta sheet
    Standings(StandingsArgs),

    /// Validate a regatta sheet
    Check {
        /// Regatta sheet (JSON)
        sheet: PathBuf,
    },

    /// Inspect the configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn run(cli: Cli) -> Result<(), CliError> {
    let logging = LoggingConfig {
        level: if cli.verbose { "debug" } else { "warn" }.to_string(),
        file: cli.log_file.clone(),
    };
    let _guard = init_logging(&logging)?;

    let config = cli.config.as_ref();
    match cli.command {
        Commands::Standings(args) => commands::standings::run(args, config),
        Commands::Check { sheet } => commands::check::run(&sheet, config),
        Commands::Config(command) => commands::config::run(command, config),
    }
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
