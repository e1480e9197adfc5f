//! Seascore - scoring and ranking engine for sailing regatta leaderboards
//!
//! A [`Leaderboard`] is a table of race columns grouped into series and
//! fleets. Races bound to those columns (anything implementing
//! [`TrackedRace`]) deliver ranks; the leaderboard turns them into net and
//! total points under a [`ScoringScheme`], applies score corrections and
//! discards, and ranks competitors with the tie-breaking cascade of the
//! racing rules.
//!
//! ```
//! use std::sync::Arc;
//! use seascore::{
//!     Competitor, FinishOrderRace, Leaderboard, LeaderboardConfig, ScoringScheme,
//!     ThresholdDiscardingRule, TimePoint,
//! };
//!
//! let board = Leaderboard::flexible(
//!     "Club Race",
//!     ScoringScheme::LowPoint,
//!     ThresholdDiscardingRule::none(),
//!     &LeaderboardConfig::default(),
//! )
//! .unwrap();
//! let (a, b) = (Competitor::named("Alpha"), Competitor::named("Bravo"));
//! let race = FinishOrderRace::new("R1", TimePoint::from_millis(0), vec![b.clone(), a.clone()]);
//! board.add_race(Arc::new(race), "R1", false, None).unwrap();
//!
//! let at = TimePoint::from_millis(1);
//! assert_eq!(board.get_total_points(&a, at).unwrap(), Some(2.0));
//! assert_eq!(board.get_competitors_from_best_to_worst(at).unwrap(), vec![b, a]);
//! ```

pub mod cache;
pub mod competitor;
pub mod config;
pub mod error;
pub mod leaderboard;
pub mod logging;
pub mod model;
pub mod overall;
pub mod scoring;
pub mod snapshot;
pub mod time;
pub mod tracking;

pub use cache::CacheStats;
pub use competitor::Competitor;
pub use config::{ConfigError, ConfigFile, LeaderboardConfig};
pub use error::{LeaderboardError, LeaderboardResult, NoWindError, RaceError};
pub use leaderboard::{
    Leaderboard, LeaderboardChange, LeaderboardEntry, LeaderboardListener, ScoreCorrectionHandle,
};
pub use model::{BoatClass, ColumnId, Fleet, RaceColumn, Regatta, Series, SeriesDefinition};
pub use overall::{link_child, LeaderboardRace};
pub use scoring::{MaxPointsReason, ScoringScheme, ThresholdDiscardingRule};
pub use snapshot::{LeaderboardSnapshot, SnapshotRequest};
pub use time::TimePoint;
pub use tracking::{FinishOrderRace, TrackedRace};
