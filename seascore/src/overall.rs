//! Overall leaderboards.
//!
//! An overall (meta) leaderboard scores whole events: each of its columns is
//! backed by a child leaderboard whose final ranking acts as the race result.
//! [`LeaderboardRace`] adapts a child to [`TrackedRace`], and [`link_child`]
//! binds it and subscribes the parent to the child's changes.

use std::sync::{Arc, Weak};

use crate::competitor::Competitor;
use crate::error::{LeaderboardError, LeaderboardResult, RaceError};
use crate::leaderboard::{Leaderboard, LeaderboardListener};
use crate::model::ColumnId;
use crate::snapshot::{LeaderboardSnapshot, SnapshotRequest};
use crate::time::TimePoint;
use crate::tracking::TrackedRace;

/// A child leaderboard seen as a single race.
#[derive(Debug)]
pub struct LeaderboardRace {
    name: String,
    leaderboard: Arc<Leaderboard>,
}

impl LeaderboardRace {
    pub fn new(leaderboard: Arc<Leaderboard>) -> Self {
        Self {
            name: leaderboard.name(),
            leaderboard,
        }
    }

    pub fn leaderboard(&self) -> &Arc<Leaderboard> {
        &self.leaderboard
    }

    fn bound_races(&self) -> Vec<Arc<dyn TrackedRace>> {
        self.leaderboard
            .race_columns()
            .iter()
            .flat_map(|column| {
                column
                    .tracked_races()
                    .map(|(_, race)| Arc::clone(race))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// The child's cached standings; recomputed only after the child changed.
    fn standings(&self, at: TimePoint) -> Result<Arc<LeaderboardSnapshot>, RaceError> {
        self.leaderboard
            .get_leaderboard_snapshot(at, &SnapshotRequest::all())
            .map_err(|error| match error {
                LeaderboardError::NoWind(no_wind) => RaceError::NoWind(no_wind),
                other => RaceError::Leaderboard {
                    leaderboard: self.name.clone(),
                    source: Arc::new(other),
                },
            })
    }
}

impl TrackedRace for LeaderboardRace {
    fn name(&self) -> &str {
        &self.name
    }

    /// Start of the earliest race of the child.
    fn start_of_race(&self) -> Option<TimePoint> {
        self.bound_races()
            .iter()
            .filter_map(|race| race.start_of_race())
            .min()
    }

    /// End of the latest race, once every race of the child has ended.
    fn end_of_race(&self) -> Option<TimePoint> {
        let races = self.bound_races();
        if races.is_empty() {
            return None;
        }
        races
            .iter()
            .map(|race| race.end_of_race())
            .collect::<Option<Vec<_>>>()?
            .into_iter()
            .max()
    }

    fn competitors(&self) -> Vec<Competitor> {
        self.leaderboard
            .competitors()
            .into_iter()
            .filter(|competitor| !self.leaderboard.is_suppressed(competitor))
            .collect()
    }

    fn rank(&self, competitor: &Competitor, at: TimePoint) -> Result<u32, RaceError> {
        Ok(self
            .standings(at)?
            .row(competitor)
            .map_or(0, |row| row.rank as u32))
    }

    fn competitors_from_best_to_worst(&self, at: TimePoint) -> Result<Vec<Competitor>, RaceError> {
        Ok(self.standings(at)?.competitors().into_iter().cloned().collect())
    }
}

/// Bind `child` as the race of `column_name` in `parent` and make changes of
/// the child invalidate the parent.
pub fn link_child(
    parent: &Arc<Leaderboard>,
    child: Arc<Leaderboard>,
    column_name: &str,
) -> LeaderboardResult<ColumnId> {
    let race: Arc<dyn TrackedRace> = Arc::new(LeaderboardRace::new(Arc::clone(&child)));
    let column = parent.add_race(race, column_name, false, None)?;
    let listener: Weak<dyn LeaderboardListener> = Arc::downgrade(parent) as Weak<dyn LeaderboardListener>;
    child.add_listener(listener);
    tracing::info!(parent = %parent.name(), child = %child.name(), column = column_name, "linked child leaderboard");
    Ok(column.id())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LeaderboardConfig;
    use crate::scoring::{ScoringScheme, ThresholdDiscardingRule};
    use crate::tracking::FinishOrderRace;

    fn event(name: &str, order: &[Competitor]) -> Arc<Leaderboard> {
        let board = Leaderboard::flexible(
            name,
            ScoringScheme::LowPoint,
            ThresholdDiscardingRule::none(),
            &LeaderboardConfig::default(),
        )
        .unwrap();
        let race = FinishOrderRace::new("R1", TimePoint::from_millis(100), order.to_vec())
            .with_end(TimePoint::from_millis(200));
        board.add_race(Arc::new(race), "R1", false, None).unwrap();
        Arc::new(board)
    }

    #[test]
    fn test_child_ranking_is_race_result() {
        let (a, b) = (Competitor::named("A"), Competitor::named("B"));
        let race = LeaderboardRace::new(event("Event 1", &[b.clone(), a.clone()]));

        assert_eq!(race.name(), "Event 1");
        assert_eq!(race.start_of_race(), Some(TimePoint::from_millis(100)));
        assert_eq!(race.end_of_race(), Some(TimePoint::from_millis(200)));
        let at = TimePoint::from_millis(300);
        assert_eq!(race.rank(&b, at).unwrap(), 1);
        assert_eq!(race.rank(&a, at).unwrap(), 2);
        assert_eq!(race.rank(&Competitor::named("C"), at).unwrap(), 0);
    }

    #[test]
    fn test_child_ranking_reuses_cached_standings() {
        let (a, b) = (Competitor::named("A"), Competitor::named("B"));
        let child = event("Event 1", &[a.clone(), b.clone()]);
        let race = LeaderboardRace::new(Arc::clone(&child));
        let at = TimePoint::from_millis(300);

        for _ in 0..5 {
            assert_eq!(race.rank(&a, at).unwrap(), 1);
            assert_eq!(race.rank(&b, at).unwrap(), 2);
        }
        assert_eq!(race.competitors_from_best_to_worst(at).unwrap(), vec![a.clone(), b.clone()]);
        let stats = child.cache_stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 10);

        child.set_carried_points(&a, 5.0);
        assert_eq!(race.rank(&a, at).unwrap(), 2);
        assert_eq!(child.cache_stats().misses, 2);
    }

    #[test]
    fn test_empty_child_has_no_times() {
        let board = Leaderboard::flexible(
            "Empty",
            ScoringScheme::LowPoint,
            ThresholdDiscardingRule::none(),
            &LeaderboardConfig::default(),
        )
        .unwrap();
        let race = LeaderboardRace::new(Arc::new(board));
        assert_eq!(race.start_of_race(), None);
        assert_eq!(race.end_of_race(), None);
    }
}
