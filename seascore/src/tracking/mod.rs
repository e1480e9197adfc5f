//! The boundary to race tracking.
//!
//! The scoring engine never looks at tracks, wind or geometry. Everything it
//! needs from a race comes through [`TrackedRace`]: when the race started and
//! ended, who sailed in it, and the ranking at a given time point.
//!
//! [`FinishOrderRace`] is a plain in-memory implementation for races that are
//! scored from a finish sheet rather than from live tracking.

mod finish_order;

pub use finish_order::FinishOrderRace;

use std::fmt;

use crate::competitor::Competitor;
use crate::error::RaceError;
use crate::time::TimePoint;

/// A race as seen by the scoring engine.
///
/// Implementations must be cheap to query repeatedly; the engine asks for the
/// same ranks many times while computing one leaderboard.
pub trait TrackedRace: Send + Sync + fmt::Debug {
    /// Display name of the race.
    fn name(&self) -> &str;

    /// Start time, if known.
    fn start_of_race(&self) -> Option<TimePoint>;

    /// Finish time of the last boat, if known.
    fn end_of_race(&self) -> Option<TimePoint>;

    /// Whether the race had started at `at`.
    fn has_started(&self, at: TimePoint) -> bool {
        self.start_of_race().is_some_and(|start| start <= at)
    }

    /// Every competitor registered for this race.
    fn competitors(&self) -> Vec<Competitor>;

    /// The 1-based rank of `competitor` at `at`, or 0 when not ranked.
    ///
    /// # Errors
    ///
    /// Returns [`RaceError::NoWind`] when ranking needs wind data that is missing.
    fn rank(&self, competitor: &Competitor, at: TimePoint) -> Result<u32, RaceError>;

    /// Competitors ordered from first to last at `at`.
    ///
    /// # Errors
    ///
    /// Returns [`RaceError::NoWind`] when ranking needs wind data that is missing.
    fn competitors_from_best_to_worst(
        &self,
        at: TimePoint,
    ) -> Result<Vec<Competitor>, RaceError>;
}
