//! Per-query computation of column results.
//!
//! An `Engine` evaluates one structural snapshot at one time point. It
//! memoizes everything it resolves (fleet membership, cells, column
//! validity) so that ranking, which asks for the same cells many times,
//! stays linear in competitors times columns.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::sync::Arc;

use crate::competitor::Competitor;
use crate::error::LeaderboardResult;
use crate::leaderboard::structure::Structure;
use crate::model::{ColumnId, RaceColumn};
use crate::scoring::{effective_from, ColumnProgress, CorrectionKind, MaxPointsReason};
use crate::time::TimePoint;
use crate::tracking::TrackedRace;

/// One competitor's resolved result in one column.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Cell {
    /// Rank reported by the tracked race, 0 when not ranked.
    pub(crate) tracked_rank: u32,
    /// Rank after moving up past penalized boats; `None` when not scored from a rank.
    pub(crate) scored_rank: Option<u32>,
    /// Unscaled points; `None` until the result counts.
    pub(crate) net_points: Option<f64>,
    /// An explicit score or max-points reason is in effect.
    pub(crate) corrected: bool,
    pub(crate) reason: Option<MaxPointsReason>,
    /// The competitor's race had started.
    pub(crate) raced: bool,
    /// Index of the competitor's fleet within the column's series.
    pub(crate) fleet: Option<usize>,
    pub(crate) fleet_size: u32,
}

pub(crate) struct Engine<'s> {
    structure: &'s Structure,
    at: TimePoint,
    competitors: Vec<Competitor>,
    positions: HashMap<String, usize>,
    memberships: RefCell<HashMap<ColumnId, Rc<HashMap<String, usize>>>>,
    cells: RefCell<HashMap<(usize, ColumnId), Cell>>,
    penalized: RefCell<HashMap<(ColumnId, usize), Rc<Vec<u32>>>>,
    validity: RefCell<HashMap<ColumnId, bool>>,
    previous_ends: RefCell<HashMap<ColumnId, Option<TimePoint>>>,
}

impl<'s> Engine<'s> {
    pub(crate) fn new(structure: &'s Structure, at: TimePoint) -> Self {
        let competitors = structure.all_competitors();
        let positions = competitors
            .iter()
            .enumerate()
            .map(|(index, competitor)| (competitor.id().to_string(), index))
            .collect();
        Self {
            structure,
            at,
            competitors,
            positions,
            memberships: RefCell::new(HashMap::new()),
            cells: RefCell::new(HashMap::new()),
            penalized: RefCell::new(HashMap::new()),
            validity: RefCell::new(HashMap::new()),
            previous_ends: RefCell::new(HashMap::new()),
        }
    }

    pub(crate) fn structure(&self) -> &'s Structure {
        self.structure
    }

    pub(crate) fn at(&self) -> TimePoint {
        self.at
    }

    /// All competitors, suppressed ones included.
    pub(crate) fn competitors(&self) -> &[Competitor] {
        &self.competitors
    }

    pub(crate) fn position(&self, competitor: &Competitor) -> Option<usize> {
        self.positions.get(competitor.id()).copied()
    }

    /// Indices of competitors that appear in rankings.
    pub(crate) fn ranked_competitors(&self) -> Vec<usize> {
        (0..self.competitors.len())
            .filter(|index| !self.structure.is_suppressed(&self.competitors[*index]))
            .collect()
    }

    pub(crate) fn factor(&self, column: &RaceColumn) -> f64 {
        self.structure.factor(column)
    }

    /// Fleet index of every competitor bound to a race of the column.
    fn membership(&self, column: &RaceColumn) -> Rc<HashMap<String, usize>> {
        if let Some(found) = self.memberships.borrow().get(&column.id()) {
            return Rc::clone(found);
        }
        let mut membership = HashMap::new();
        for (index, fleet) in self.structure.series_of(column).fleets().iter().enumerate() {
            if let Some(race) = column.tracked_race(fleet.name()) {
                for competitor in race.competitors() {
                    membership.entry(competitor.id().to_string()).or_insert(index);
                }
            }
        }
        let membership = Rc::new(membership);
        self.memberships
            .borrow_mut()
            .insert(column.id(), Rc::clone(&membership));
        membership
    }

    /// The competitor's fleet index and race in the column.
    fn race_of(
        &self,
        column: &'s RaceColumn,
        competitor: &Competitor,
    ) -> Option<(usize, &'s Arc<dyn TrackedRace>)> {
        let fleet = *self.membership(column).get(competitor.id())?;
        let name = self.structure.series_of(column).fleets()[fleet].name();
        column.tracked_race(name).map(|race| (fleet, race))
    }

    /// End (or start) of the closest earlier column with a started race.
    fn previous_race_end(&self, column: &RaceColumn) -> Option<TimePoint> {
        if let Some(found) = self.previous_ends.borrow().get(&column.id()) {
            return *found;
        }
        let order = &self.structure.column_order;
        let position = order.iter().position(|id| *id == column.id()).unwrap_or(0);
        let end = order[..position].iter().rev().find_map(|id| {
            let earlier = &self.structure.columns[id.index()];
            earlier
                .tracked_races()
                .filter(|(_, race)| race.has_started(self.at))
                .filter_map(|(_, race)| race.end_of_race().or_else(|| race.start_of_race()))
                .max()
        });
        self.previous_ends.borrow_mut().insert(column.id(), end);
        end
    }

    fn is_effective(
        &self,
        kind: CorrectionKind,
        column: &RaceColumn,
        own_race: Option<&Arc<dyn TrackedRace>>,
    ) -> bool {
        let own_started = own_race.filter(|race| race.has_started(self.at));
        let previous = if own_started.is_none() && !column.is_carry_forward() {
            self.previous_race_end(column)
        } else {
            None
        };
        effective_from(
            kind,
            column.is_carry_forward(),
            own_started.map(|race| &**race),
            previous,
            self.at,
        )
        .is_effective(self.at)
    }

    /// Tracked ranks of boats in the race whose max-points reason is in effect.
    fn penalized_ranks(
        &self,
        column: &RaceColumn,
        fleet: usize,
        race: &Arc<dyn TrackedRace>,
    ) -> LeaderboardResult<Rc<Vec<u32>>> {
        if let Some(found) = self.penalized.borrow().get(&(column.id(), fleet)) {
            return Ok(Rc::clone(found));
        }
        let mut ranks = Vec::new();
        for competitor in race.competitors() {
            let reason = self
                .structure
                .corrections
                .get(competitor.id(), column.id())
                .and_then(|record| record.max_points_reason);
            if let Some(reason) = reason {
                if self.is_effective(CorrectionKind::MaxPoints(reason), column, Some(race)) {
                    let rank = race.rank(&competitor, self.at)?;
                    if rank > 0 {
                        ranks.push(rank);
                    }
                }
            }
        }
        let ranks = Rc::new(ranks);
        self.penalized
            .borrow_mut()
            .insert((column.id(), fleet), Rc::clone(&ranks));
        Ok(ranks)
    }

    /// Resolve a competitor's result in a column.
    pub(crate) fn cell(&self, competitor: usize, column: &'s RaceColumn) -> LeaderboardResult<Cell> {
        if let Some(found) = self.cells.borrow().get(&(competitor, column.id())) {
            return Ok(*found);
        }
        let cell = self.compute_cell(competitor, column)?;
        self.cells
            .borrow_mut()
            .insert((competitor, column.id()), cell);
        Ok(cell)
    }

    fn compute_cell(&self, index: usize, column: &'s RaceColumn) -> LeaderboardResult<Cell> {
        let competitor = &self.competitors[index];
        let scheme = self.structure.scheme;
        let membership = self.race_of(column, competitor);
        let own_race = membership.map(|(_, race)| race);
        let raced = own_race.is_some_and(|race| race.has_started(self.at));

        let tracked_rank = match own_race {
            Some(race) if raced => race.rank(competitor, self.at)?,
            _ => 0,
        };
        let fleet_size = own_race.map_or(self.competitors.len(), |race| race.competitors().len()) as u32;

        let record = self
            .structure
            .corrections
            .get(competitor.id(), column.id())
            .copied()
            .unwrap_or_default();
        let explicit = record
            .explicit_score
            .filter(|_| self.is_effective(CorrectionKind::ExplicitScore, column, own_race));
        let reason = record
            .max_points_reason
            .filter(|reason| self.is_effective(CorrectionKind::MaxPoints(*reason), column, own_race));

        let mut scored_rank = None;
        let net_points = if let Some(score) = explicit {
            Some(score)
        } else if reason.is_some() {
            Some(scheme.penalty_points(fleet_size))
        } else if tracked_rank > 0 {
            let ahead = match membership {
                Some((fleet, race)) => self
                    .penalized_ranks(column, fleet, race)?
                    .iter()
                    .filter(|rank| **rank < tracked_rank)
                    .count() as u32,
                None => 0,
            };
            let rank = tracked_rank - ahead;
            scored_rank = Some(rank);
            Some(scheme.points_for_rank(rank, fleet_size, false))
        } else {
            None
        };

        Ok(Cell {
            tracked_rank,
            scored_rank,
            net_points,
            corrected: explicit.is_some() || reason.is_some(),
            reason,
            raced,
            fleet: membership.map(|(fleet, _)| fleet),
            fleet_size,
        })
    }

    /// How far the column is towards counting in totals.
    pub(crate) fn progress(&self, column: &RaceColumn) -> ColumnProgress {
        let series = self.structure.series_of(column);
        if !series.is_unordered_group() {
            return ColumnProgress::default();
        }

        let started: Vec<&Arc<dyn TrackedRace>> = series
            .fleets()
            .iter()
            .filter_map(|fleet| column.tracked_race(fleet.name()))
            .filter(|race| race.has_started(self.at))
            .collect();
        let fleets_pending = series.fleets().len() - started.len();

        let substituted_results = if fleets_pending == 0 {
            0
        } else {
            let participants: HashSet<String> = started
                .iter()
                .flat_map(|race| race.competitors())
                .map(|competitor| competitor.id().to_string())
                .collect();
            self.structure
                .corrections
                .corrected_in(column.id())
                .filter(|(id, _)| !participants.contains(*id))
                .filter(|(_, record)| {
                    record.explicit_score.is_some_and(|_| {
                        self.is_effective(CorrectionKind::ExplicitScore, column, None)
                    }) || record.max_points_reason.is_some_and(|reason| {
                        self.is_effective(CorrectionKind::MaxPoints(reason), column, None)
                    })
                })
                .count()
        };

        ColumnProgress {
            unordered_group: true,
            fleets_pending,
            substituted_results,
        }
    }

    /// Whether the column's results enter total scores at this time point.
    pub(crate) fn is_valid(&self, column: &RaceColumn) -> bool {
        if let Some(found) = self.validity.borrow().get(&column.id()) {
            return *found;
        }
        let valid = self
            .structure
            .scheme
            .is_valid_in_total_score(&self.progress(column));
        self.validity.borrow_mut().insert(column.id(), valid);
        valid
    }
}
