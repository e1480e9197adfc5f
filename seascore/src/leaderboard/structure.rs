//! The structural state of a leaderboard.
//!
//! A `Structure` is immutable once published behind the leaderboard's lock;
//! mutations clone it on write, so a query holding an `Arc<Structure>` keeps
//! a consistent view while writers move on.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::competitor::Competitor;
use crate::error::{LeaderboardError, LeaderboardResult};
use crate::model::{BoatClass, ColumnId, Fleet, RaceColumn, Series, SeriesDefinition};
use crate::scoring::{ScoreCorrection, ScoringScheme, ThresholdDiscardingRule};
use crate::tracking::TrackedRace;

static NEXT_BOARD_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone)]
pub(crate) struct Structure {
    pub(crate) board: u64,
    /// Bumped on every change that can alter results.
    pub(crate) version: u64,
    pub(crate) name: String,
    pub(crate) display_name: Option<String>,
    pub(crate) boat_class: Option<BoatClass>,
    /// Flexible leaderboards accept new fleets when races are added.
    pub(crate) is_flexible: bool,
    pub(crate) scheme: ScoringScheme,
    pub(crate) discarding_rule: ThresholdDiscardingRule,
    pub(crate) medal_race_factor: f64,
    pub(crate) series: Vec<Series>,
    /// Indexed by `ColumnId::index`.
    pub(crate) columns: Vec<RaceColumn>,
    /// Series-major race order.
    pub(crate) column_order: Vec<ColumnId>,
    pub(crate) registered: Vec<Competitor>,
    pub(crate) carried_points: HashMap<String, f64>,
    pub(crate) suppressed: HashSet<String>,
    pub(crate) display_names: HashMap<String, String>,
    pub(crate) corrections: ScoreCorrection,
}

impl Structure {
    pub(crate) fn new(
        name: String,
        scheme: ScoringScheme,
        discarding_rule: ThresholdDiscardingRule,
        medal_race_factor: f64,
    ) -> Self {
        Self {
            board: NEXT_BOARD_ID.fetch_add(1, Ordering::Relaxed),
            version: 0,
            name,
            display_name: None,
            boat_class: None,
            is_flexible: false,
            scheme,
            discarding_rule,
            medal_race_factor,
            series: Vec::new(),
            columns: Vec::new(),
            column_order: Vec::new(),
            registered: Vec::new(),
            carried_points: HashMap::new(),
            suppressed: HashSet::new(),
            display_names: HashMap::new(),
            corrections: ScoreCorrection::new(),
        }
    }

    pub(crate) fn add_series(&mut self, definition: &SeriesDefinition) -> LeaderboardResult<usize> {
        if self.series.iter().any(|s| s.name() == definition.name()) {
            return Err(LeaderboardError::DuplicateSeries(definition.name().to_string()));
        }
        self.series.push(Series::from_definition(definition));
        let index = self.series.len() - 1;
        for column in &definition.column_names {
            self.add_column(index, column, false)?;
        }
        Ok(index)
    }

    pub(crate) fn series_index(&self, name: &str) -> LeaderboardResult<usize> {
        self.series
            .iter()
            .position(|series| series.name() == name)
            .ok_or_else(|| LeaderboardError::UnknownSeries(name.to_string()))
    }

    /// Append a column to a series.
    ///
    /// The first column of a carry-forward series becomes the carry column.
    /// Medal series make every column a medal race.
    pub(crate) fn add_column(
        &mut self,
        series_index: usize,
        name: &str,
        is_medal_race: bool,
    ) -> LeaderboardResult<ColumnId> {
        if self.column_by_name(name).is_some() {
            return Err(LeaderboardError::DuplicateRaceColumn(name.to_string()));
        }
        let series = self
            .series
            .get(series_index)
            .ok_or_else(|| LeaderboardError::UnknownSeries(series_index.to_string()))?;

        let first = series.columns().is_empty();
        let id = ColumnId::new(self.board, self.columns.len() as u32);
        let column = RaceColumn::new(
            id,
            name.to_string(),
            series_index,
            series.is_medal() || is_medal_race,
            first && series.first_column_is_non_discardable_carry_forward(),
            first,
        );

        self.columns.push(column);
        self.series[series_index].push_column(id);
        self.column_order = self
            .series
            .iter()
            .flat_map(|series| series.columns().iter().copied())
            .collect();
        Ok(id)
    }

    pub(crate) fn column(&self, id: ColumnId) -> LeaderboardResult<&RaceColumn> {
        if id.board() != self.board {
            return Err(LeaderboardError::UnknownRaceColumn(id.to_string()));
        }
        self.columns
            .get(id.index())
            .ok_or_else(|| LeaderboardError::UnknownRaceColumn(id.to_string()))
    }

    pub(crate) fn column_mut(&mut self, id: ColumnId) -> LeaderboardResult<&mut RaceColumn> {
        if id.board() != self.board {
            return Err(LeaderboardError::UnknownRaceColumn(id.to_string()));
        }
        self.columns
            .get_mut(id.index())
            .ok_or_else(|| LeaderboardError::UnknownRaceColumn(id.to_string()))
    }

    pub(crate) fn column_by_name(&self, name: &str) -> Option<&RaceColumn> {
        self.columns.iter().find(|column| column.name() == name)
    }

    pub(crate) fn series_of(&self, column: &RaceColumn) -> &Series {
        &self.series[column.series_index()]
    }

    /// Columns in race order.
    pub(crate) fn ordered_columns(&self) -> impl Iterator<Item = &RaceColumn> {
        self.column_order.iter().map(|id| &self.columns[id.index()])
    }

    pub(crate) fn factor(&self, column: &RaceColumn) -> f64 {
        self.scheme.score_factor(
            column.explicit_factor(),
            column.is_medal_race(),
            self.medal_race_factor,
        )
    }

    /// Resolve the fleet a race is bound to; `None` means the series' first fleet.
    ///
    /// Flexible leaderboards create unknown fleets on the fly, so for them
    /// the returned flag tells the caller to add the fleet.
    pub(crate) fn resolve_fleet(
        &self,
        column: &RaceColumn,
        fleet: Option<&str>,
    ) -> LeaderboardResult<(String, bool)> {
        let series = self.series_of(column);
        match fleet {
            None => match series.fleets().first() {
                Some(first) => Ok((first.name().to_string(), false)),
                None => Ok((Fleet::default_fleet().name().to_string(), true)),
            },
            Some(name) if series.fleet(name).is_some() => Ok((name.to_string(), false)),
            Some(name) if self.is_flexible => Ok((name.to_string(), true)),
            Some(name) => Err(LeaderboardError::UnknownFleet {
                column: column.name().to_string(),
                fleet: name.to_string(),
            }),
        }
    }

    /// Fail if a different race already occupies the slot.
    pub(crate) fn check_slot(
        &self,
        column: &RaceColumn,
        fleet: &str,
        race: &Arc<dyn TrackedRace>,
    ) -> LeaderboardResult<bool> {
        match column.tracked_race(fleet) {
            Some(existing) if same_race(existing, race) => Ok(false),
            Some(_) => Err(LeaderboardError::RaceAlreadyBound {
                column: column.name().to_string(),
                fleet: fleet.to_string(),
            }),
            None => Ok(true),
        }
    }

    /// Every competitor known to the leaderboard, in order of first appearance.
    pub(crate) fn all_competitors(&self) -> Vec<Competitor> {
        let mut seen = HashSet::new();
        let mut competitors = Vec::new();
        for column in self.ordered_columns() {
            for fleet in self.series_of(column).fleets() {
                if let Some(race) = column.tracked_race(fleet.name()) {
                    for competitor in race.competitors() {
                        if seen.insert(competitor.id().to_string()) {
                            competitors.push(competitor);
                        }
                    }
                }
            }
        }
        for competitor in &self.registered {
            if seen.insert(competitor.id().to_string()) {
                competitors.push(competitor.clone());
            }
        }
        competitors
    }

    pub(crate) fn is_suppressed(&self, competitor: &Competitor) -> bool {
        self.suppressed.contains(competitor.id())
    }

    pub(crate) fn carried_points(&self, competitor: &Competitor) -> Option<f64> {
        self.carried_points.get(competitor.id()).copied()
    }

    pub(crate) fn display_name(&self, competitor: &Competitor) -> Option<&str> {
        self.display_names.get(competitor.id()).map(String::as_str)
    }
}

/// Identity comparison of two bound races.
pub(crate) fn same_race(a: &Arc<dyn TrackedRace>, b: &Arc<dyn TrackedRace>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::TimePoint;
    use crate::tracking::FinishOrderRace;

    fn structure() -> Structure {
        let mut structure = Structure::new(
            "Test".to_string(),
            ScoringScheme::LowPoint,
            ThresholdDiscardingRule::none(),
            2.0,
        );
        structure
            .add_series(&SeriesDefinition::new("Opening").with_race_columns(["R1", "R2"]))
            .unwrap();
        structure
            .add_series(
                &SeriesDefinition::new("Medal")
                    .medal()
                    .first_column_is_carry_forward()
                    .with_race_columns(["Carry", "M1"]),
            )
            .unwrap();
        structure
    }

    #[test]
    fn test_column_flags_follow_series() {
        let structure = structure();
        let names: Vec<&str> = structure.ordered_columns().map(|c| c.name()).collect();
        assert_eq!(names, vec!["R1", "R2", "Carry", "M1"]);

        let carry = structure.column_by_name("Carry").unwrap();
        assert!(carry.is_carry_forward());
        assert!(carry.is_medal_race());
        assert!(carry.starts_series());
        assert!(!structure.column_by_name("M1").unwrap().is_carry_forward());
        assert_eq!(structure.factor(structure.column_by_name("M1").unwrap()), 2.0);
    }

    #[test]
    fn test_column_order_stays_series_major() {
        let mut structure = structure();
        structure.add_column(0, "R3", false).unwrap();
        let names: Vec<&str> = structure.ordered_columns().map(|c| c.name()).collect();
        assert_eq!(names, vec!["R1", "R2", "R3", "Carry", "M1"]);
    }

    #[test]
    fn test_foreign_column_rejected() {
        let a = structure();
        let b = structure();
        let foreign = b.column_by_name("R1").unwrap().id();
        assert!(matches!(
            a.column(foreign),
            Err(LeaderboardError::UnknownRaceColumn(_))
        ));
    }

    #[test]
    fn test_check_slot_detects_conflicts() {
        let mut structure = structure();
        let id = structure.column_by_name("R1").unwrap().id();
        let first: Arc<dyn TrackedRace> =
            Arc::new(FinishOrderRace::new("R1", TimePoint::from_millis(0), vec![]));
        let second: Arc<dyn TrackedRace> =
            Arc::new(FinishOrderRace::new("R1b", TimePoint::from_millis(0), vec![]));

        structure.column_mut(id).unwrap().bind("Default", first.clone());
        let column = structure.column(id).unwrap();
        assert!(!structure.check_slot(column, "Default", &first).unwrap());
        assert!(matches!(
            structure.check_slot(column, "Default", &second),
            Err(LeaderboardError::RaceAlreadyBound { .. })
        ));
    }
}
