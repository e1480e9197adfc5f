//! CLI error type.

use std::path::PathBuf;

use seascore::logging::LoggingError;
use seascore::{ConfigError, LeaderboardError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid regatta sheet: {0}")]
    Sheet(String),

    #[error("Invalid time point '{0}': expected RFC 3339, e.g. 2024-06-22T14:00:00Z")]
    InvalidTime(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Logging error: {0}")]
    Logging(#[from] LoggingError),

    #[error(transparent)]
    Leaderboard(#[from] LeaderboardError),

    #[error("Failed to serialize output: {0}")]
    Output(#[from] serde_json::Error),
}
