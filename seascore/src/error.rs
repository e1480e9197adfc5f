//! Error types for the scoring engine.

use std::sync::Arc;

use thiserror::Error;

use crate::time::TimePoint;

/// A tracked race could not rank competitors because wind-derived data was
/// not available at the requested time point.
///
/// The engine never retries or hides this; it surfaces unchanged through
/// [`LeaderboardError::NoWind`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("no wind information for race '{race}' at {at}")]
pub struct NoWindError {
    pub race: String,
    pub at: TimePoint,
}

impl NoWindError {
    pub fn new(race: impl Into<String>, at: TimePoint) -> Self {
        Self {
            race: race.into(),
            at,
        }
    }
}

/// Why a tracked race could not rank its competitors.
#[derive(Debug, Clone, Error)]
pub enum RaceError {
    #[error(transparent)]
    NoWind(#[from] NoWindError),

    /// A child leaderboard bound as a race failed for a reason other than wind.
    #[error("leaderboard '{leaderboard}' could not rank its competitors: {source}")]
    Leaderboard {
        leaderboard: String,
        #[source]
        source: Arc<LeaderboardError>,
    },
}

/// Errors produced by leaderboard setup, mutation and queries.
///
/// "No score yet" is never an error; it is reported as `None`.
#[derive(Debug, Error)]
pub enum LeaderboardError {
    /// Ranking a bound race needed wind data that is not available.
    #[error(transparent)]
    NoWind(#[from] NoWindError),

    /// A different race is already bound to the column/fleet slot.
    #[error("race column '{column}' already has a race bound for fleet '{fleet}'")]
    RaceAlreadyBound { column: String, fleet: String },

    /// The column does not belong to this leaderboard.
    #[error("unknown race column: {0}")]
    UnknownRaceColumn(String),

    #[error("unknown series: {0}")]
    UnknownSeries(String),

    #[error("series '{0}' already exists")]
    DuplicateSeries(String),

    /// The fleet is not part of the column's series.
    #[error("race column '{column}' has no fleet named '{fleet}'")]
    UnknownFleet { column: String, fleet: String },

    /// Discard thresholds must be positive and strictly increasing.
    #[error("discard thresholds must be positive and strictly increasing: {0:?}")]
    InvalidDiscardThresholds(Vec<u32>),

    #[error("race column '{0}' already exists")]
    DuplicateRaceColumn(String),

    #[error("column factor must be finite and positive, got {0}")]
    InvalidFactor(f64),

    /// Ranking a child leaderboard bound as a race failed.
    #[error("child leaderboard '{leaderboard}' failed: {source}")]
    ChildLeaderboard {
        leaderboard: String,
        #[source]
        source: Arc<LeaderboardError>,
    },
}

impl From<RaceError> for LeaderboardError {
    fn from(error: RaceError) -> Self {
        match error {
            RaceError::NoWind(no_wind) => LeaderboardError::NoWind(no_wind),
            RaceError::Leaderboard { leaderboard, source } => {
                LeaderboardError::ChildLeaderboard { leaderboard, source }
            }
        }
    }
}

/// Result alias for leaderboard operations.
pub type LeaderboardResult<T> = Result<T, LeaderboardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_wind_converts_transparently() {
        let err: LeaderboardError = NoWindError::new("R1", TimePoint::from_millis(0)).into();
        assert!(matches!(err, LeaderboardError::NoWind(_)));
        assert!(err.to_string().starts_with("no wind information for race 'R1'"));
    }

    #[test]
    fn test_race_errors_keep_their_cause() {
        let no_wind: LeaderboardError = RaceError::from(NoWindError::new("R1", TimePoint::from_millis(0))).into();
        assert!(matches!(no_wind, LeaderboardError::NoWind(ref e) if e.race == "R1"));

        let child: LeaderboardError = RaceError::Leaderboard {
            leaderboard: "Event 1".to_string(),
            source: Arc::new(LeaderboardError::UnknownSeries("Final".to_string())),
        }
        .into();
        assert!(matches!(
            child,
            LeaderboardError::ChildLeaderboard { ref source, .. }
                if matches!(**source, LeaderboardError::UnknownSeries(_))
        ));
        assert_eq!(
            child.to_string(),
            "child leaderboard 'Event 1' failed: unknown series: Final"
        );
    }

    #[test]
    fn test_race_already_bound_message() {
        let err = LeaderboardError::RaceAlreadyBound {
            column: "R1".to_string(),
            fleet: "Gold".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "race column 'R1' already has a race bound for fleet 'Gold'"
        );
    }
}
