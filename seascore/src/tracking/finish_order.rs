//! A race scored from a fixed finish order.

use crate::competitor::Competitor;
use crate::error::RaceError;
use crate::time::TimePoint;
use crate::tracking::TrackedRace;

/// A race whose result is a known finish order.
///
/// Ranks are positions in the finish order once the race has started and 0
/// before. Competitors that are registered but missing from the order (for
/// example boats that never crossed the line) stay unranked.
///
/// # Example
///
/// ```ignore
/// let start = TimePoint::from_millis(1_000);
/// let race = FinishOrderRace::new("R1", start, vec![alpha.clone(), bravo.clone()]);
/// assert_eq!(race.rank(&bravo, start)?, 2);
/// ```
#[derive(Debug, Clone)]
pub struct FinishOrderRace {
    name: String,
    start: Option<TimePoint>,
    end: Option<TimePoint>,
    finish_order: Vec<Competitor>,
    registered: Vec<Competitor>,
}

impl FinishOrderRace {
    /// Create a started race with the given finish order.
    pub fn new(name: impl Into<String>, start: TimePoint, finish_order: Vec<Competitor>) -> Self {
        Self {
            name: name.into(),
            start: Some(start),
            end: None,
            registered: finish_order.clone(),
            finish_order,
        }
    }

    /// Create a race with no start time; it never counts until replaced.
    pub fn unscheduled(name: impl Into<String>, competitors: Vec<Competitor>) -> Self {
        Self {
            name: name.into(),
            start: None,
            end: None,
            registered: competitors,
            finish_order: Vec::new(),
        }
    }

    /// Set the time the race ended.
    pub fn with_end(mut self, end: TimePoint) -> Self {
        self.end = Some(end);
        self
    }

    /// Register additional competitors that are not in the finish order.
    pub fn with_non_finishers(mut self, competitors: impl IntoIterator<Item = Competitor>) -> Self {
        for competitor in competitors {
            if !self.registered.contains(&competitor) {
                self.registered.push(competitor);
            }
        }
        self
    }
}

impl TrackedRace for FinishOrderRace {
    fn name(&self) -> &str {
        &self.name
    }

    fn start_of_race(&self) -> Option<TimePoint> {
        self.start
    }

    fn end_of_race(&self) -> Option<TimePoint> {
        self.end
    }

    fn competitors(&self) -> Vec<Competitor> {
        self.registered.clone()
    }

    fn rank(&self, competitor: &Competitor, at: TimePoint) -> Result<u32, RaceError> {
        if !self.has_started(at) {
            return Ok(0);
        }
        Ok(self
            .finish_order
            .iter()
            .position(|c| c == competitor)
            .map_or(0, |index| index as u32 + 1))
    }

    fn competitors_from_best_to_worst(
        &self,
        at: TimePoint,
    ) -> Result<Vec<Competitor>, RaceError> {
        if !self.has_started(at) {
            return Ok(Vec::new());
        }
        Ok(self.finish_order.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boats() -> Vec<Competitor> {
        vec![
            Competitor::named("A"),
            Competitor::named("B"),
            Competitor::named("C"),
        ]
    }

    #[test]
    fn test_rank_is_position_after_start() {
        let start = TimePoint::from_millis(100);
        let race = FinishOrderRace::new("R1", start, boats());

        assert_eq!(race.rank(&Competitor::named("C"), start).unwrap(), 3);
        assert_eq!(
            race.rank(&Competitor::named("A"), start.plus_millis(-1)).unwrap(),
            0
        );
    }

    #[test]
    fn test_non_finisher_is_registered_but_unranked() {
        let start = TimePoint::from_millis(0);
        let race = FinishOrderRace::new("R1", start, boats())
            .with_non_finishers(vec![Competitor::named("D")]);

        assert_eq!(race.competitors().len(), 4);
        assert_eq!(race.rank(&Competitor::named("D"), start).unwrap(), 0);
    }

    #[test]
    fn test_unscheduled_race_never_starts() {
        let race = FinishOrderRace::unscheduled("R9", boats());
        assert!(!race.has_started(TimePoint::from_millis(i64::MAX)));
        assert!(race
            .competitors_from_best_to_worst(TimePoint::now())
            .unwrap()
            .is_empty());
    }
}
