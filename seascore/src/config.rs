//! Leaderboard configuration.
//!
//! [`LeaderboardConfig`] carries the tunables a `Leaderboard` is built with.
//! [`ConfigFile`] loads them, together with scoring defaults for new
//! leaderboards, from an INI file:
//!
//! ```ini
//! [leaderboard]
//! cache_capacity = 10
//! medal_race_factor = 2.0
//!
//! [scoring]
//! scheme = low_point
//! discard_thresholds = 3,6
//! ```

use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;

use crate::cache::DEFAULT_SNAPSHOT_CACHE_CAPACITY;
use crate::scoring::{ScoringScheme, ThresholdDiscardingRule, DEFAULT_MEDAL_RACE_FACTOR};

/// Directory name under the platform config directory.
pub const CONFIG_DIR_NAME: &str = "seascore";

/// File name of the default configuration file.
pub const CONFIG_FILE_NAME: &str = "config.ini";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}

/// Tunables of a single leaderboard.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardConfig {
    /// Maximum number of cached snapshots (distinct time points and requests).
    pub snapshot_cache_capacity: u64,

    /// Factor applied to medal race columns without an explicit factor.
    pub medal_race_factor: f64,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            snapshot_cache_capacity: DEFAULT_SNAPSHOT_CACHE_CAPACITY,
            medal_race_factor: DEFAULT_MEDAL_RACE_FACTOR,
        }
    }
}

impl LeaderboardConfig {
    pub fn with_snapshot_cache_capacity(mut self, capacity: u64) -> Self {
        self.snapshot_cache_capacity = capacity;
        self
    }

    pub fn with_medal_race_factor(mut self, factor: f64) -> Self {
        self.medal_race_factor = factor;
        self
    }
}

/// Scoring defaults for leaderboards created without a regatta.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoringSettings {
    pub scheme: ScoringScheme,
    pub discarding_rule: ThresholdDiscardingRule,
}

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub leaderboard: LeaderboardConfig,
    pub scoring: ScoringSettings,
}

impl ConfigFile {
    /// `<config_dir>/seascore/config.ini`, if the platform has a config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load the default file, falling back to defaults when it does not exist.
    pub fn load_default() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::load_from_str(&contents)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Parse INI text. Missing sections and keys keep their defaults.
    pub fn load_from_str(contents: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let mut config = Self::default();

        if let Some(section) = ini.section(Some("leaderboard")) {
            if let Some(value) = section.get("cache_capacity") {
                config.leaderboard.snapshot_cache_capacity =
                    parse_value("leaderboard.cache_capacity", value)?;
            }
            if let Some(value) = section.get("medal_race_factor") {
                let factor: f64 = parse_value("leaderboard.medal_race_factor", value)?;
                if !factor.is_finite() || factor <= 0.0 {
                    return Err(invalid("leaderboard.medal_race_factor", value));
                }
                config.leaderboard.medal_race_factor = factor;
            }
        }

        if let Some(section) = ini.section(Some("scoring")) {
            if let Some(value) = section.get("scheme") {
                config.scoring.scheme = parse_value("scoring.scheme", value)?;
            }
            if let Some(value) = section.get("discard_thresholds") {
                config.scoring.discarding_rule = parse_thresholds(value)?;
            }
        }

        Ok(config)
    }

    /// Render as INI text that [`ConfigFile::load_from_str`] reads back.
    pub fn to_ini_string(&self) -> String {
        let thresholds: Vec<String> = self
            .scoring
            .discarding_rule
            .thresholds()
            .iter()
            .map(u32::to_string)
            .collect();
        format!(
            "[leaderboard]\ncache_capacity = {}\nmedal_race_factor = {}\n\n[scoring]\nscheme = {}\ndiscard_thresholds = {}\n",
            self.leaderboard.snapshot_cache_capacity,
            self.leaderboard.medal_race_factor,
            self.scoring.scheme.as_str(),
            thresholds.join(","),
        )
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| invalid(key, value))
}

fn parse_thresholds(value: &str) -> Result<ThresholdDiscardingRule, ConfigError> {
    let key = "scoring.discard_thresholds";
    let thresholds = value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| parse_value::<u32>(key, part))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| invalid(key, value))?;
    ThresholdDiscardingRule::new(thresholds).map_err(|_| invalid(key, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = LeaderboardConfig::default();
        assert_eq!(config.snapshot_cache_capacity, 10);
        assert_eq!(config.medal_race_factor, 2.0);
    }

    #[test]
    fn test_empty_file_keeps_defaults() {
        assert_eq!(ConfigFile::load_from_str("").unwrap(), ConfigFile::default());
    }

    #[test]
    fn test_full_file() {
        let config = ConfigFile::load_from_str(
            "[leaderboard]\ncache_capacity = 4\nmedal_race_factor = 1.5\n\n[scoring]\nscheme = high-point\ndiscard_thresholds = 3, 6\n",
        )
        .unwrap();
        assert_eq!(config.leaderboard.snapshot_cache_capacity, 4);
        assert_eq!(config.leaderboard.medal_race_factor, 1.5);
        assert_eq!(config.scoring.scheme, ScoringScheme::HighPoint);
        assert_eq!(config.scoring.discarding_rule.thresholds(), &[3, 6]);
    }

    #[test]
    fn test_invalid_values() {
        let err = ConfigFile::load_from_str("[leaderboard]\ncache_capacity = many\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "leaderboard.cache_capacity"));

        let err = ConfigFile::load_from_str("[scoring]\ndiscard_thresholds = 6,3\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let err = ConfigFile::load_from_str("[leaderboard]\nmedal_race_factor = -1\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_load_from_file_round_trip() {
        let mut config = ConfigFile::default();
        config.leaderboard = config.leaderboard.with_snapshot_cache_capacity(3);
        config.scoring.discarding_rule = ThresholdDiscardingRule::new(vec![4]).unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(config.to_ini_string().as_bytes()).unwrap();

        assert_eq!(ConfigFile::load(file.path()).unwrap(), config);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigFile::load(&dir.path().join("absent.ini")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
