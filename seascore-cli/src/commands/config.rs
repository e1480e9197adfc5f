//! Configuration CLI commands.

use std::path::PathBuf;

use clap::Subcommand;
use seascore::ConfigFile;

use super::common::load_config;
use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,

    /// Show the default configuration file path
    Path,
}

pub fn run(command: ConfigCommands, config_path: Option<&PathBuf>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Show => {
            let config = load_config(config_path)?;
            print!("{}", config.to_ini_string());
            Ok(())
        }
        ConfigCommands::Path => {
            match config_path.cloned().or_else(ConfigFile::default_path) {
                Some(path) => {
                    let state = if path.exists() { "" } else { " (not found, using defaults)" };
                    println!("{}{}", path.display(), state);
                }
                None => println!("(no configuration directory on this platform)"),
            }
            Ok(())
        }
    }
}
